//! Fixed capacities shared by the whole pipeline.
//!
//! The interned-symbol id space is partitioned into three disjoint ranges:
//! per-script words, keywords and natives. The ranges never overlap, so a
//! bare `i32` symbol id always identifies which table it came from.

pub const MAX_WORDS: i32 = 128;
pub const MAX_KEYWORDS: i32 = 192;
pub const MAX_NATIVES: i32 = 128;

pub const WORD_START: i32 = 0;
pub const KEYWORD_START: i32 = WORD_START + MAX_WORDS;
pub const NATIVE_START: i32 = KEYWORD_START + MAX_KEYWORDS;

pub const MAX_PREAMBLE_PROGRAM_SIZE: usize = 120;
pub const MAX_PROGRAM_SIZE: usize = 2048;
pub const MAX_TRAIT_PROGRAM_SIZE: usize = 256;

pub const STACK_SIZE: usize = 1024;
pub const HEAP_SIZE: usize = 1024;

// how low the heap free list can get before a sweep is attempted
pub const HEAP_MIN_SIZE: usize = 10;

pub const MEMORY_GLOBAL_SIZE: usize = 40;
pub const MEMORY_LOCAL_SIZE: usize = 40;

pub const MAX_TOP_LEVEL_FUNCTIONS: usize = 32;
pub const MAX_NUM_ARGUMENTS: usize = 16;

pub fn is_word(iname: i32) -> bool {
    (WORD_START..WORD_START + MAX_WORDS).contains(&iname)
}

pub fn is_keyword(iname: i32) -> bool {
    (KEYWORD_START..KEYWORD_START + MAX_KEYWORDS).contains(&iname)
}

pub fn is_native(iname: i32) -> bool {
    (NATIVE_START..NATIVE_START + MAX_NATIVES).contains(&iname)
}
