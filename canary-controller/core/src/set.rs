use ahash::AHashMap as HashMap;

/// Compares two string collections as multisets: order is ignored but each
/// element must appear the same number of times in both.
pub fn set_equal<S: AsRef<str>>(a: &[S], b: &[S]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut counts = HashMap::<&str, usize>::with_capacity(a.len());
    for s in a {
        *counts.entry(s.as_ref()).or_default() += 1;
    }
    for s in b {
        match counts.get_mut(s.as_ref()) {
            Some(n) if *n > 0 => *n -= 1,
            _ => return false,
        }
    }
    true
}
