//! Natural ("human") ordering of file names.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Natural string comparison for sorting.
///
/// Runs of ASCII digits compare by numeric value, so `page2` sorts before
/// `page10`. Other characters compare case-insensitively. Strings that are
/// equal under those rules fall back to plain byte order, which keeps the
/// ordering total.
pub fn natord_compare(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek(), b_chars.peek()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ac), Some(&bc)) => {
                if ac.is_ascii_digit() && bc.is_ascii_digit() {
                    let a_num = take_digits(&mut a_chars);
                    let b_num = take_digits(&mut b_chars);

                    match compare_numeric(&a_num, &b_num) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                } else {
                    a_chars.next();
                    b_chars.next();

                    match ac.to_lowercase().cmp(bc.to_lowercase()) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
            }
        }
    }
}

/// Consume a run of ASCII digits without swallowing the character after it.
fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

/// Compare two digit runs by value without overflowing.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
