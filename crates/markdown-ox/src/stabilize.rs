use std::borrow::Cow;

/// Derive a render-safe string from a possibly truncated markdown buffer.
///
/// Unterminated constructs are force-closed in a fixed order: fenced code,
/// inline code, bold, italic, link label. Each step is independent and the
/// whole pass is a no-op on balanced input, in which case the original slice
/// is returned unchanged. The stored buffer is never mutated; callers render
/// the derived string only while the owning message is still streaming.
pub fn stabilize(input: &str) -> Cow<'_, str> {
    let mut closes = String::new();

    // 1. Fenced code: an odd number of ``` markers means the last fence is
    //    still open.
    if count_occurrences(input, "```") % 2 == 1 {
        closes.push_str("\n```");
    }

    // 2. Inline code: backtick parity outside the (now closed) fences.
    if backticks_outside_fences(input) % 2 == 1 {
        closes.push('`');
    }

    let masked = outside_code(input);
    let (bold_pairs, stray_stars) = star_runs(&masked);

    // 3. Bold.
    let closed_bold = bold_pairs % 2 == 1;
    if closed_bold {
        closes.push_str("**");
    }

    // 4. Italic. Skipped when bold-closing already consumed the trailing
    //    asterisks; a string ending in one or two stray `*` must not get
    //    closed twice.
    if !closed_bold && stray_stars % 2 == 1 {
        closes.push('*');
    }

    // 5. Link label. A missing `(url)` is left alone; partial links render
    //    as plain bracketed text.
    if unmatched_brackets(&masked) > 0 {
        closes.push(']');
    }

    if closes.is_empty() {
        Cow::Borrowed(input)
    } else {
        let mut stabilized = String::with_capacity(input.len() + closes.len());
        stabilized.push_str(input);
        stabilized.push_str(&closes);
        Cow::Owned(stabilized)
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Count single backticks in the text between fenced blocks. Splitting on
/// ``` leaves fence interiors at odd indices.
fn backticks_outside_fences(text: &str) -> usize {
    text.split("```")
        .step_by(2)
        .map(|segment| segment.matches('`').count())
        .sum()
}

/// Text outside both fenced blocks and inline code spans. Emphasis and
/// bracket parsing only applies out here; an unterminated inline span keeps
/// its interior masked as well.
fn outside_code(text: &str) -> String {
    let mut out = String::new();
    for segment in text.split("```").step_by(2) {
        for span in segment.split('`').step_by(2) {
            out.push_str(span);
        }
    }
    out
}

/// Tally maximal `*` runs: each run of length n yields n/2 bold pairs and
/// n%2 stray single stars.
fn star_runs(text: &str) -> (usize, usize) {
    let mut bold_pairs = 0;
    let mut stray = 0;
    let mut run = 0usize;
    for c in text.chars() {
        if c == '*' {
            run += 1;
        } else if run > 0 {
            bold_pairs += run / 2;
            stray += run % 2;
            run = 0;
        }
    }
    bold_pairs += run / 2;
    stray += run % 2;
    (bold_pairs, stray)
}

fn unmatched_brackets(text: &str) -> usize {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_input_is_returned_unchanged() {
        let input = "A **bold** claim with `code` and a [link](https://x.dev).\n\n```rs\nfn main() {}\n```\n";
        assert!(matches!(stabilize(input), Cow::Borrowed(_)));
    }

    #[test]
    fn open_fence_is_closed() {
        assert_eq!(stabilize("Hello ```js\ncode"), "Hello ```js\ncode\n```");
    }

    #[test]
    fn open_bold_is_closed() {
        assert_eq!(stabilize("some **bold text"), "some **bold text**");
    }

    #[test]
    fn open_link_label_is_closed() {
        assert_eq!(stabilize("see [link text"), "see [link text]");
    }

    #[test]
    fn open_inline_code_is_closed() {
        assert_eq!(stabilize("run `cargo tes"), "run `cargo tes`");
    }

    #[test]
    fn open_italic_is_closed() {
        assert_eq!(stabilize("an *emphatic claim"), "an *emphatic claim*");
    }

    #[test]
    fn bold_close_suppresses_italic_close() {
        // Ends in exactly two stray stars: bold closes, italic must not
        // pile a third star on.
        assert_eq!(stabilize("tail **"), "tail ****");
    }

    #[test]
    fn markup_inside_fences_is_ignored() {
        let input = "```\nlet a = b[0]; // ** not markdown **\n```\n";
        assert!(matches!(stabilize(input), Cow::Borrowed(_)));
    }

    #[test]
    fn markup_inside_inline_code_is_ignored() {
        assert!(matches!(stabilize("use `arr[0]` here"), Cow::Borrowed(_)));
    }

    #[test]
    fn interior_of_open_fence_is_masked() {
        // The dangling bracket lives inside the unterminated fence, so only
        // the fence itself needs closing.
        assert_eq!(stabilize("```py\nx = arr["), "```py\nx = arr[\n```");
    }

    #[test]
    fn combined_constructs_close_in_order() {
        assert_eq!(stabilize("**see [docs"), "**see [docs**]");
    }

    #[test]
    fn stabilization_is_idempotent() {
        let once = stabilize("Hello ```js\ncode").into_owned();
        assert_eq!(stabilize(&once), once.as_str());
    }

    #[test]
    fn never_panics_on_pathological_input() {
        for input in ["", "`", "``", "````", "*", "**", "***", "[", "][", "[[["] {
            let _ = stabilize(input);
        }
    }
}
