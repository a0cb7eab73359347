//! Incremental frame extraction from an MJPEG
//! (`multipart/x-mixed-replace`) byte stream.
//!
//! The camera backend emits parts like
//! `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg bytes>\r\n`. Rather
//! than parse the multipart framing, the splitter scans for the JPEG
//! start/end markers and yields whatever complete frames have arrived;
//! the part headers between frames contain no `FFD8` and fall out
//! naturally. Good enough for camera MJPEG, which never embeds nested
//! JPEG thumbnails.

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

#[derive(Debug, Default)]
pub struct FrameSplitter {
    buf: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk and returns every complete JPEG frame now
    /// available. Frames may span chunks, and a single chunk may carry
    /// several frames.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.buf, SOI) else {
                // No frame start buffered. Keep the trailing byte in case
                // a marker is split across the chunk boundary.
                let tail = self.buf.len().saturating_sub(1);
                self.buf.drain(..tail);
                break;
            };
            let Some(end) = find_marker(self.buf.get(start + SOI.len()..).unwrap_or(&[]), EOI)
            else {
                // Frame started but not finished; discard leading noise.
                self.buf.drain(..start);
                break;
            };
            let frame_end = start + SOI.len() + end + EOI.len();
            frames.push(self.buf.get(start..frame_end).unwrap_or(&[]).to_vec());
            self.buf.drain(..frame_end);
        }
        frames
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut frame = SOI.to_vec();
        frame.extend_from_slice(body);
        frame.extend_from_slice(&EOI);
        frame
    }

    #[test]
    fn single_frame_in_one_chunk() {
        let mut splitter = FrameSplitter::new();
        let frame = jpeg(b"pixels");
        let mut stream = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(b"\r\n");
        assert_eq!(splitter.push(&stream), vec![frame]);
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut splitter = FrameSplitter::new();
        let frame = jpeg(b"split across two reads");
        let (a, b) = frame.split_at(7);
        assert!(splitter.push(a).is_empty());
        assert_eq!(splitter.push(b), vec![frame.clone()]);
    }

    #[test]
    fn marker_split_exactly_on_chunk_boundary() {
        let mut splitter = FrameSplitter::new();
        let frame = jpeg(b"x");
        // first chunk ends with the 0xFF of the EOI marker
        let (a, b) = frame.split_at(frame.len() - 1);
        assert!(splitter.push(a).is_empty());
        assert_eq!(splitter.push(b), vec![frame.clone()]);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut splitter = FrameSplitter::new();
        let first = jpeg(b"one");
        let second = jpeg(b"two");
        let mut stream = first.clone();
        stream.extend_from_slice(b"\r\n--frame\r\n\r\n");
        stream.extend_from_slice(&second);
        assert_eq!(splitter.push(&stream), vec![first, second]);
    }

    #[test]
    fn part_headers_without_frames_are_dropped() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n").is_empty());
        // buffer must not grow without bound on headers alone
        assert!(splitter.buf.len() <= 1);
    }
}
