//! Lenient HTML structure scanner.
//!
//! Walks the input the way an HTML tokenizer does and only fails on input the
//! tokenizer cannot turn into a node: a tag, comment or declaration cut off by
//! end of input, or a quoted attribute value that never closes. Misnested or
//! unclosed elements are fine; browsers repair those.

use std::fmt;

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script", "textarea", "title"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupError {
  pub offset: usize,
  pub message: String,
}

impl fmt::Display for MarkupError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl std::error::Error for MarkupError {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
  /// Start tags seen.
  pub elements: usize,
  pub comments: usize,
}

struct Scanner<'a> {
  src: &'a str,
  bytes: &'a [u8],
  pos: usize,
  summary: ScanSummary,
}

pub fn scan(src: &str) -> Result<ScanSummary, MarkupError> {
  let mut s = Scanner { src, bytes: src.as_bytes(), pos: 0, summary: ScanSummary::default() };
  s.run()?;
  Ok(s.summary)
}

impl<'a> Scanner<'a> {
  fn run(&mut self) -> Result<(), MarkupError> {
    while let Some(rel) = self.bytes[self.pos..].iter().position(|b| *b == b'<') {
      let lt = self.pos + rel;
      self.pos = lt + 1;
      match self.peek() {
        Some(b'!') => self.declaration(lt)?,
        Some(b'/') => self.end_tag(lt)?,
        Some(b'?') => self.skip_bogus_comment(),
        Some(c) if c.is_ascii_alphabetic() => {
          let name = self.start_tag(lt)?;
          if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.skip_raw_text(&name);
          }
        }
        // `<` followed by anything else is plain text.
        _ => {}
      }
    }
    Ok(())
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn err(&self, offset: usize, message: String) -> MarkupError {
    MarkupError { offset, message }
  }

  fn find_from(&self, needle: &str) -> Option<usize> {
    self.src[self.pos..].find(needle).map(|i| self.pos + i)
  }

  fn declaration(&mut self, lt: usize) -> Result<(), MarkupError> {
    if self.src[self.pos..].starts_with("!--") {
      self.pos += 3;
      return match self.find_from("-->") {
        Some(end) => {
          self.pos = end + 3;
          self.summary.comments += 1;
          Ok(())
        }
        None => Err(self.err(lt, "unterminated comment".into())),
      };
    }
    match self.find_from(">") {
      Some(end) => {
        self.pos = end + 1;
        Ok(())
      }
      None => Err(self.err(lt, "unterminated markup declaration".into())),
    }
  }

  fn end_tag(&mut self, lt: usize) -> Result<(), MarkupError> {
    self.pos += 1;
    match self.peek() {
      Some(c) if c.is_ascii_alphabetic() => {
        let name = self.tag_name();
        match self.find_from(">") {
          Some(end) => {
            self.pos = end + 1;
            Ok(())
          }
          None => Err(self.err(lt, format!("unterminated end tag </{}>", name))),
        }
      }
      // `</>` is dropped by the tokenizer.
      Some(b'>') => {
        self.pos += 1;
        Ok(())
      }
      None => Ok(()),
      _ => {
        self.skip_bogus_comment();
        Ok(())
      }
    }
  }

  fn start_tag(&mut self, lt: usize) -> Result<String, MarkupError> {
    let name = self.tag_name();
    self.summary.elements += 1;
    loop {
      self.skip_whitespace();
      match self.peek() {
        None => return Err(self.err(lt, format!("unterminated tag <{}>", name))),
        Some(b'>') => {
          self.pos += 1;
          return Ok(name);
        }
        Some(b'/') => self.pos += 1,
        Some(_) => self.attribute(lt, &name)?,
      }
    }
  }

  fn attribute(&mut self, lt: usize, tag: &str) -> Result<(), MarkupError> {
    // Name: the first char may be anything, including `=`.
    self.pos += 1;
    while let Some(c) = self.peek() {
      if c.is_ascii_whitespace() || matches!(c, b'=' | b'>' | b'/') {
        break;
      }
      self.pos += 1;
    }
    self.skip_whitespace();
    if self.peek() != Some(b'=') {
      return Ok(());
    }
    self.pos += 1;
    self.skip_whitespace();
    match self.peek() {
      Some(q @ (b'"' | b'\'')) => {
        self.pos += 1;
        match self.bytes[self.pos..].iter().position(|b| *b == q) {
          Some(rel) => {
            self.pos += rel + 1;
            Ok(())
          }
          None => Err(self.err(lt, format!("unterminated attribute value in <{}>", tag))),
        }
      }
      _ => {
        while let Some(c) = self.peek() {
          if c.is_ascii_whitespace() || c == b'>' {
            break;
          }
          self.pos += 1;
        }
        Ok(())
      }
    }
  }

  fn tag_name(&mut self) -> String {
    let start = self.pos;
    while let Some(c) = self.peek() {
      if c.is_ascii_whitespace() || matches!(c, b'/' | b'>') {
        break;
      }
      self.pos += 1;
    }
    self.src[start..self.pos].to_ascii_lowercase()
  }

  fn skip_whitespace(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
      self.pos += 1;
    }
  }

  /// `<?...>` and `</ ...>` run to the next `>` or end of input.
  fn skip_bogus_comment(&mut self) {
    self.pos = self.find_from(">").map(|e| e + 1).unwrap_or(self.bytes.len());
  }

  /// Raw text runs to `</name` (any case) or end of input.
  fn skip_raw_text(&mut self, name: &str) {
    let needle = format!("</{}", name);
    let rest = self.src[self.pos..].to_ascii_lowercase();
    self.pos = match rest.find(&needle) {
      Some(i) => self.pos + i,
      None => self.bytes.len(),
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn well_formed_document_scans() {
    let s = scan("<!DOCTYPE html><html><head><title>a < b</title></head><body><!-- hi --><p id=x class='y'>t</p></body></html>").unwrap();
    assert_eq!(s.elements, 5);
    assert_eq!(s.comments, 1);
  }

  #[test]
  fn misnested_elements_are_recoverable() {
    assert!(scan("<b><i>text</b></i><div><span>").is_ok());
  }

  #[test]
  fn stray_angle_brackets_are_text() {
    assert!(scan("a < b and c > d <3 < div>").is_ok());
    assert!(scan("trailing <").is_ok());
  }

  #[test]
  fn raw_text_content_is_not_tokenized() {
    let s = scan("<style>a > b { content: \"<p class='\"; }</style><script>if (a<b) {}</script>").unwrap();
    assert_eq!(s.elements, 2);
  }

  #[test]
  fn unterminated_start_tag_fails() {
    let e = scan("<div class=\"a\"").unwrap_err();
    assert_eq!(e.message, "unterminated tag <div>");
    assert_eq!(e.offset, 0);
  }

  #[test]
  fn unterminated_attribute_value_fails() {
    let e = scan("<p>ok</p><a href=\"x>link</a>").unwrap_err();
    assert_eq!(e.to_string(), "unterminated attribute value in <a>");
    assert_eq!(e.offset, 9);
  }

  #[test]
  fn unterminated_comment_and_declaration_fail() {
    assert_eq!(scan("<p></p><!-- open").unwrap_err().message, "unterminated comment");
    assert_eq!(scan("<!DOCTYPE html").unwrap_err().message, "unterminated markup declaration");
  }

  #[test]
  fn unterminated_end_tag_fails() {
    assert_eq!(scan("<p>x</p").unwrap_err().message, "unterminated end tag </p>");
  }

  #[test]
  fn bogus_comments_are_tolerated() {
    assert!(scan("<?xml version=\"1.0\"?><p></p></ weird>").is_ok());
    assert!(scan("<p></>x</p>").is_ok());
  }
}
