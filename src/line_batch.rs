use crate::canvas::{Canvas, Paint};

/// Fixed-capacity accumulator of line segments, drawn with one call.
///
/// The buffer is sized once; lines past capacity are dropped rather than
/// growing the allocation on the draw path.
#[derive(Debug, Clone)]
pub struct LineBatch {
    buffer: Box<[f32]>,
    max_lines: usize,
    line_count: usize,
}

impl LineBatch {
    /// Creates a batch able to hold `max_lines` segments.
    pub fn new(max_lines: usize) -> Self {
        Self {
            buffer: vec![0.0; max_lines * 4].into_boxed_slice(),
            max_lines,
            line_count: 0,
        }
    }

    /// Appends a segment; a no-op once the batch is full.
    #[inline]
    pub fn add_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        if self.line_count < self.max_lines {
            let at = self.line_count * 4;
            self.buffer[at..at + 4].copy_from_slice(&[x1, y1, x2, y2]);
            self.line_count += 1;
        }
    }

    /// Number of segments currently held.
    pub fn len(&self) -> usize {
        self.line_count
    }

    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_lines
    }

    /// Draws all held segments in a single call and empties the batch.
    ///
    /// Issues nothing when the batch is empty.
    pub fn flush(&mut self, canvas: &mut dyn Canvas, paint: &Paint) {
        if self.line_count > 0 {
            canvas.draw_lines(&self.buffer[..self.line_count * 4], paint);
            self.line_count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCmd, RecordingCanvas};

    #[test]
    fn drops_lines_past_capacity() {
        let mut batch = LineBatch::new(2);
        batch.add_line(0.0, 0.0, 1.0, 1.0);
        batch.add_line(1.0, 1.0, 2.0, 2.0);
        batch.add_line(2.0, 2.0, 3.0, 3.0);

        assert_eq!(batch.len(), 2);

        let mut canvas = RecordingCanvas::new(100, 100);
        batch.flush(&mut canvas, &Paint::new());
        match &canvas.commands()[0] {
            DrawCmd::Lines { points, .. } => {
                assert_eq!(points, &[0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
            }
            other => panic!("expected a line batch, got {other:?}"),
        }
    }

    #[test]
    fn flush_resets_and_skips_empty_batches() {
        let mut batch = LineBatch::new(4);
        let mut canvas = RecordingCanvas::new(100, 100);

        batch.flush(&mut canvas, &Paint::new());
        assert!(canvas.commands().is_empty());

        batch.add_line(0.0, 0.0, 5.0, 5.0);
        batch.flush(&mut canvas, &Paint::new());
        assert!(batch.is_empty());
        assert_eq!(canvas.line_batches(), 1);

        batch.flush(&mut canvas, &Paint::new());
        assert_eq!(canvas.line_batches(), 1);
    }

    #[test]
    fn zero_capacity_never_draws() {
        let mut batch = LineBatch::new(0);
        batch.add_line(0.0, 0.0, 1.0, 1.0);
        let mut canvas = RecordingCanvas::new(1, 1);
        batch.flush(&mut canvas, &Paint::new());
        assert!(canvas.commands().is_empty());
    }
}
