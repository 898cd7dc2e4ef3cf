/// A write received on the characteristic, classified for logging.
///
/// Borrowed from the stack's buffer; nothing is retained past the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePayload<'a> {
    Empty,
    Text(&'a str),
    Binary(&'a [u8]),
}

impl<'a> WritePayload<'a> {
    pub fn classify(data: &'a [u8]) -> Self {
        if data.is_empty() {
            return WritePayload::Empty;
        }
        match core::str::from_utf8(data) {
            Ok(text) => WritePayload::Text(text),
            Err(_) => WritePayload::Binary(data),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WritePayload::Empty => 0,
            WritePayload::Text(s) => s.len(),
            WritePayload::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, WritePayload::Empty)
    }
}
