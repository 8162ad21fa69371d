//! Small utility helpers used across modules.

/// Replace every `{key}` in `tpl` with its value. Unknown placeholders stay as-is.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Cut `s` to at most `max` bytes on a char boundary, noting the full length.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_all_occurrences() {
    assert_eq!(fill_template("{a}-{b}-{a}", &[("a", "x"), ("b", "y")]), "x-y-x");
    assert_eq!(fill_template("{missing}", &[]), "{missing}");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert_eq!(trunc_for_log("héllo", 2), "h… (6 bytes total)");
  }
}
