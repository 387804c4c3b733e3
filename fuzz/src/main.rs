//! Fuzz target exercising the byte state machine (Layer A) directly, one
//! arbitrary slice at a time — the level at which resumption across a buffer
//! boundary actually has to be exact.

use noajson::options::JsonParserOptions;
use noajson::parser::{ParseContext, ParserState};

#[macro_use]
extern crate afl;

fn main() {
    fuzz!(|data: &[u8]| {
        let options = JsonParserOptions::default();
        let mut state = ParserState::new(&options);
        let mut ctx = ParseContext::new();
        let mut consumed = 0usize;
        while consumed < data.len() {
            let n = match state.parse(&mut ctx, &data[consumed..], consumed as u64) {
                Ok(n) => n,
                Err(_) => return,
            };
            state.clear_values();
            consumed += n;
            if n == 0 {
                break;
            }
        }
        let _ = state.finish();
    });
}
