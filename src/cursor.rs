//! Fixed-capacity text cursor used by every serializer.
//!
//! Writes append to an internal buffer and fail with `CursorOverflow` once
//! the capacity is spent; reads consume the same buffer front to back.

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Cursor {
    buffer: String,
    capacity: usize,
    read: usize,
}

impl Cursor {
    pub fn with_capacity(capacity: usize) -> Self {
        Cursor {
            buffer: String::with_capacity(capacity),
            capacity,
            read: 0,
        }
    }

    /// Wraps existing serialized text for reading.
    pub fn from_str(s: &str) -> Self {
        Cursor {
            buffer: s.to_string(),
            capacity: s.len(),
            read: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read = 0;
    }

    /// Rewinds the read position to the start of the buffer.
    pub fn reset(&mut self) {
        self.read = 0;
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        if self.buffer.len() + s.len() > self.capacity {
            return Err(Error::CursorOverflow);
        }
        self.buffer.push_str(s);
        Ok(())
    }

    pub fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        self.write_str(&args.to_string())
    }

    fn remaining(&self) -> &str {
        &self.buffer[self.read..]
    }

    pub fn eat_space(&mut self) {
        while self.remaining().starts_with(' ') {
            self.read += 1;
        }
    }

    fn eat_token(&mut self) -> &str {
        self.eat_space();
        let rest = &self.buffer[self.read..];
        let len = rest.find(' ').unwrap_or(rest.len());
        let token = &self.buffer[self.read..self.read + len];
        self.read += len;
        token
    }

    /// Consumes `text` if the buffer continues with it.
    pub fn eat_text(&mut self, text: &str) -> bool {
        if self.remaining().starts_with(text) {
            self.read += text.len();
            true
        } else {
            false
        }
    }

    pub fn eat_i32(&mut self) -> Result<i32> {
        self.eat_token()
            .parse()
            .map_err(|_| Error::Deserialization("i32"))
    }

    pub fn eat_f32(&mut self) -> Result<f32> {
        self.eat_token()
            .parse()
            .map_err(|_| Error::Deserialization("f32"))
    }

    pub fn eat_u64(&mut self) -> Result<u64> {
        self.eat_token()
            .parse()
            .map_err(|_| Error::Deserialization("u64"))
    }

    /// Next whitespace-delimited token, for tag dispatch.
    pub fn eat_word(&mut self) -> String {
        self.eat_token().to_string()
    }
}
