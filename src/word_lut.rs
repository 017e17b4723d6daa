//! The interned-string table shared by the parser, compiler and unparser.
//!
//! Natives and keywords are registered once at engine startup and persist;
//! the word range holds per-script user identifiers and is reset before
//! every parse.

use log::error;

use crate::config::{KEYWORD_START, MAX_KEYWORDS, MAX_NATIVES, MAX_WORDS, NATIVE_START, WORD_START};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct WordLut {
    natives: Vec<String>,
    keywords: Vec<String>,
    words: Vec<String>,
}

impl WordLut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears only the per-script word range; keywords and natives persist.
    pub fn reset_words(&mut self) {
        self.words.clear();
    }

    pub fn add_native(&mut self, name: &str) -> Result<i32> {
        if self.natives.len() >= MAX_NATIVES as usize {
            error!("add_native: native lookup table is full");
            return Err(Error::WordLutFull);
        }
        self.natives.push(name.to_string());
        Ok(NATIVE_START + self.natives.len() as i32 - 1)
    }

    pub fn add_keyword(&mut self, name: &str) -> Result<i32> {
        if self.keywords.len() >= MAX_KEYWORDS as usize {
            error!("add_keyword: keyword lookup table is full");
            return Err(Error::WordLutFull);
        }
        self.keywords.push(name.to_string());
        Ok(KEYWORD_START + self.keywords.len() as i32 - 1)
    }

    pub fn add_word(&mut self, name: &str) -> Result<i32> {
        if self.words.len() >= MAX_WORDS as usize {
            error!("add_word: word lookup table is full");
            return Err(Error::WordLutFull);
        }
        self.words.push(name.to_string());
        Ok(WORD_START + self.words.len() as i32 - 1)
    }

    /// Linear scan, natives first, then keywords, then words.
    pub fn lookup(&self, name: &str) -> Option<i32> {
        if let Some(i) = self.natives.iter().position(|n| n == name) {
            return Some(NATIVE_START + i as i32);
        }
        if let Some(i) = self.keywords.iter().position(|n| n == name) {
            return Some(KEYWORD_START + i as i32);
        }
        if let Some(i) = self.words.iter().position(|n| n == name) {
            return Some(WORD_START + i as i32);
        }
        None
    }

    pub fn lookup_or_add(&mut self, name: &str) -> Result<i32> {
        match self.lookup(name) {
            Some(iname) => Ok(iname),
            None => self.add_word(name),
        }
    }

    /// Maps a symbol id back to its string.
    pub fn reverse_lookup(&self, iname: i32) -> Option<&str> {
        if iname >= NATIVE_START {
            self.natives.get((iname - NATIVE_START) as usize)
        } else if iname >= KEYWORD_START {
            self.keywords.get((iname - KEYWORD_START) as usize)
        } else {
            self.words.get((iname - WORD_START) as usize)
        }
        .map(|s| s.as_str())
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}
