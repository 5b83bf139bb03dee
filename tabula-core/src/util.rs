/// Writes `values` into `out` through `f`, placing `separator` between any two
/// entries that actually produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Length of the longest prefix of `value` not exceeding `max` bytes that ends on a
/// char boundary.
pub fn prefix_len(value: &str, max: usize) -> usize {
    if value.len() <= max {
        return value.len();
    }
    (0..=max).rev().find(|i| value.is_char_boundary(*i)).unwrap_or(0)
}

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:expr, $cond:expr, $v:expr) => {
        if $cond {
            $buff.push('(');
            $v;
            $buff.push(')');
        } else {
            $v;
        }
    };
}

/// Formats long text (usually SQL) cut at about 500 bytes, for error messages and logs.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..$crate::prefix_len($query, 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
