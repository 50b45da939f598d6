/// Dialog typewriter: multi-page text revealed one character at a time.
///
/// ## Reveal loop
///
/// Starting a page appends its first character at once. After that a
/// single `OneShotTimer` fires once per character, each delay drawn
/// uniformly from `[min_delay_ms, max_delay_ms]`. The page is done (and
/// `is_fully_revealed()` turns true) the moment its last character lands.
///
/// Every state change that starts or ends a reveal cancels the pending
/// timer first, so a stale firing can never append to the wrong page.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::timer::OneShotTimer;

pub const DEFAULT_REVEAL_MIN_MS: u64 = 50;
pub const DEFAULT_REVEAL_MAX_MS: u64 = 100;

#[derive(Clone, Debug)]
pub struct DialogTypewriter {
    pages: Vec<String>,
    page_index: usize,
    revealed: String,
    /// Byte offset into the current page of the next character to reveal.
    cursor: usize,
    revealing: bool,
    timer: OneShotTimer,
    min_delay_ms: u64,
    max_delay_ms: u64,
    rng: StdRng,
}

impl DialogTypewriter {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        DialogTypewriter::with_rng(min_delay_ms, max_delay_ms, StdRng::from_entropy())
    }

    /// Deterministic delays, for tests and replays.
    pub fn with_seed(min_delay_ms: u64, max_delay_ms: u64, seed: u64) -> Self {
        DialogTypewriter::with_rng(min_delay_ms, max_delay_ms, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min_delay_ms: u64, max_delay_ms: u64, rng: StdRng) -> Self {
        DialogTypewriter {
            pages: Vec::new(),
            page_index: 0,
            revealed: String::new(),
            cursor: 0,
            revealing: false,
            timer: OneShotTimer::new(),
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms: max_delay_ms.max(min_delay_ms),
            rng,
        }
    }

    /// Replace the page list and start revealing page 0.
    pub fn set_pages<I, S>(&mut self, pages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop();
        self.pages = pages.into_iter().map(Into::into).collect();
        self.page_index = 0;
        self.revealed.clear();
        self.cursor = 0;
        if !self.pages.is_empty() {
            self.start_page();
        }
    }

    /// Single-page shorthand for `set_pages`.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_pages([text.into()]);
    }

    /// Skip the typing effect: show the whole current page now.
    pub fn complete_reveal(&mut self) {
        self.stop();
        if let Some(page) = self.pages.get(self.page_index) {
            self.revealed.clone_from(page);
            self.cursor = page.len();
        }
    }

    /// Move to the next page. Returns false (and blanks the text) when
    /// there is none.
    pub fn advance_page(&mut self) -> bool {
        if self.page_index + 1 < self.pages.len() {
            self.stop();
            self.page_index += 1;
            self.revealed.clear();
            self.cursor = 0;
            self.start_page();
            true
        } else {
            self.stop();
            self.revealed.clear();
            false
        }
    }

    /// Drop all pages and any pending reveal.
    pub fn clear(&mut self) {
        self.stop();
        self.pages.clear();
        self.page_index = 0;
        self.revealed.clear();
        self.cursor = 0;
    }

    /// Let `elapsed_ms` pass. Returns how many characters were revealed.
    pub fn advance(&mut self, elapsed_ms: u64) -> usize {
        let mut budget = elapsed_ms;
        let mut count = 0;
        while let Some(left) = self.timer.advance(budget) {
            if self.reveal_next() {
                count += 1;
            }
            budget = left;
        }
        count
    }

    // ── Queries ──

    pub fn is_fully_revealed(&self) -> bool {
        !self.revealing
    }

    pub fn has_content(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn revealed(&self) -> &str {
        &self.revealed
    }

    pub fn current_page(&self) -> Option<&str> {
        self.pages.get(self.page_index).map(String::as_str)
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_last_page(&self) -> bool {
        self.page_index + 1 >= self.pages.len()
    }

    pub fn reveal_pending(&self) -> bool {
        self.timer.is_pending()
    }

    // ── Internal ──

    fn start_page(&mut self) {
        self.revealing = true;
        debug!(page = self.page_index, of = self.pages.len(), "dialog_page_started");
        self.reveal_next();
    }

    /// Append one character and schedule the next, or finish the page.
    fn reveal_next(&mut self) -> bool {
        let page = match self.pages.get(self.page_index) {
            Some(p) => p,
            None => {
                self.stop();
                return false;
            }
        };
        let Some(ch) = page[self.cursor..].chars().next() else {
            self.stop();
            return false;
        };
        self.revealed.push(ch);
        self.cursor += ch.len_utf8();

        if self.cursor < page.len() {
            let delay = self.rng.gen_range(self.min_delay_ms..=self.max_delay_ms);
            self.timer.arm(delay);
        } else {
            self.stop();
        }
        true
    }

    fn stop(&mut self) {
        self.timer.cancel();
        self.revealing = false;
    }
}

impl Default for DialogTypewriter {
    fn default() -> Self {
        DialogTypewriter::new(DEFAULT_REVEAL_MIN_MS, DEFAULT_REVEAL_MAX_MS)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn typewriter() -> DialogTypewriter {
        DialogTypewriter::with_seed(DEFAULT_REVEAL_MIN_MS, DEFAULT_REVEAL_MAX_MS, 7)
    }

    /// Run timers until nothing is pending.
    fn drain(tw: &mut DialogTypewriter) {
        let mut guard = 0;
        while tw.reveal_pending() {
            tw.advance(DEFAULT_REVEAL_MAX_MS);
            guard += 1;
            assert!(guard < 10_000);
        }
    }

    #[test]
    fn pages_reveal_and_advance() {
        let mut tw = typewriter();
        tw.set_pages(["AB", "C"]);
        assert!(tw.has_content());
        drain(&mut tw);
        assert_eq!(tw.revealed(), "AB");
        assert!(tw.is_fully_revealed());

        assert!(tw.advance_page());
        drain(&mut tw);
        assert_eq!(tw.revealed(), "C");

        assert!(!tw.advance_page());
        assert_eq!(tw.revealed(), "");
        assert!(tw.has_content());
    }

    #[test]
    fn first_character_is_immediate_then_one_per_firing() {
        let mut tw = typewriter();
        tw.set_text("Hello");
        assert_eq!(tw.revealed(), "H");
        assert!(!tw.is_fully_revealed());

        // Delays are at least the minimum.
        assert_eq!(tw.advance(DEFAULT_REVEAL_MIN_MS - 1), 0);
        assert_eq!(tw.revealed(), "H");

        let mut last = tw.revealed().len();
        while !tw.is_fully_revealed() {
            tw.advance(DEFAULT_REVEAL_MIN_MS);
            assert!(tw.revealed().len() <= last + 1);
            last = tw.revealed().len();
        }
        assert_eq!(tw.revealed(), "Hello");
    }

    #[test]
    fn long_advance_reveals_several_characters() {
        let mut tw = typewriter();
        tw.set_text("abcdef");
        let n = tw.advance(DEFAULT_REVEAL_MAX_MS * 10);
        assert_eq!(n, 5);
        assert_eq!(tw.revealed(), "abcdef");
        assert!(!tw.reveal_pending());
    }

    #[test]
    fn revealed_is_always_a_prefix() {
        let mut tw = typewriter();
        tw.set_text("Ünïcødé ✓");
        let full = tw.current_page().unwrap().to_string();
        while !tw.is_fully_revealed() {
            assert!(full.starts_with(tw.revealed()));
            tw.advance(30);
        }
        assert_eq!(tw.revealed(), full);
    }

    #[test]
    fn complete_reveal_mid_page() {
        let mut tw = typewriter();
        tw.set_pages(["Long page of text", "Next"]);
        tw.advance(120);
        tw.complete_reveal();
        assert_eq!(tw.revealed(), "Long page of text");
        assert!(!tw.reveal_pending());
        assert!(tw.is_fully_revealed());
        // Nothing else gets appended later.
        tw.advance(10_000);
        assert_eq!(tw.revealed(), "Long page of text");
    }

    #[test]
    fn set_pages_cancels_previous_reveal() {
        let mut tw = typewriter();
        tw.set_text("First dialog");
        tw.advance(200);
        tw.set_pages(["XY"]);
        assert_eq!(tw.revealed(), "X");
        assert_eq!(tw.page_index(), 0);
        drain(&mut tw);
        assert_eq!(tw.revealed(), "XY");
    }

    #[test]
    fn empty_state_operations_are_noops() {
        let mut tw = typewriter();
        assert!(!tw.has_content());
        assert!(tw.is_fully_revealed());
        tw.complete_reveal();
        assert_eq!(tw.revealed(), "");
        assert!(!tw.advance_page());
        assert_eq!(tw.advance(1000), 0);

        tw.set_pages(Vec::<String>::new());
        assert!(!tw.has_content());
        assert!(!tw.reveal_pending());
    }

    #[test]
    fn empty_page_is_immediately_complete() {
        let mut tw = typewriter();
        tw.set_pages(["", "B"]);
        assert!(tw.is_fully_revealed());
        assert_eq!(tw.revealed(), "");
        assert!(tw.advance_page());
        assert_eq!(tw.revealed(), "B");
        assert!(tw.is_fully_revealed());
    }

    #[test]
    fn fixed_delay_is_exact() {
        let mut tw = DialogTypewriter::with_seed(10, 10, 1);
        tw.set_text("abc");
        assert_eq!(tw.advance(9), 0);
        assert_eq!(tw.advance(1), 1);
        assert_eq!(tw.advance(10), 1);
        assert_eq!(tw.revealed(), "abc");
        assert!(tw.is_fully_revealed());
    }

    #[test]
    fn clear_drops_everything() {
        let mut tw = typewriter();
        tw.set_pages(["a", "b"]);
        tw.clear();
        assert!(!tw.has_content());
        assert_eq!(tw.revealed(), "");
        assert!(!tw.reveal_pending());
    }
}
