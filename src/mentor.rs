//! Simulated AI mentor. Responses are canned: a random hint, or a templated
//! walkthrough of the challenge's reference solution.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Challenge;
use crate::util::fill_template;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorMode {
  Hint,
  Explain,
}

pub const HINTS: &[&str] = &[
  "💡 Think about the CSS property that sets the size of an element. What properties control width and height?",
  "🎨 For colors, you can use hex codes like #3b82f6 for blue or #ef4444 for red.",
  "📐 The 'display: flex' property is super useful for centering things! Try combining it with 'justify-content' and 'align-items'.",
  "🔄 Remember, 'border-radius: 50%' turns a square into a circle!",
  "📏 The 'gap' property in flexbox adds space between items without using margins.",
];

const EXPLAIN_TEMPLATE: &str = "## Here's how the solution works! 🎯

**Step 1: Setting up the container**
The body uses `display: flex` with `justify-content: center` and `align-items: center` to center everything.

**Step 2: Styling the element**
{target_explanation}

**Key CSS concepts used:**
- **Flexbox** for centering
- **Background colors** using hex or gradient
- **Border-radius** for rounded corners

Keep practicing! You're doing great! 🚀";

pub fn hint<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
  HINTS.choose(rng).copied().unwrap_or(HINTS[0])
}

pub fn explain(challenge: &Challenge) -> String {
  fill_template(EXPLAIN_TEMPLATE, &[("target_explanation", &challenge.target_explanation)])
}

pub fn respond<R: Rng + ?Sized>(mode: MentorMode, challenge: &Challenge, rng: &mut R) -> String {
  match mode {
    MentorMode::Hint => hint(rng).to_string(),
    MentorMode::Explain => explain(challenge),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::challenge;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  #[test]
  fn hint_comes_from_canned_list() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
      assert!(HINTS.contains(&hint(&mut rng)));
    }
  }

  #[test]
  fn explain_embeds_target_explanation() {
    let mut c = challenge("e", 1);
    c.target_explanation = "A 120px diameter red circle centered using flexbox.".into();
    let text = explain(&c);
    assert!(text.contains("A 120px diameter red circle centered using flexbox."));
    assert!(!text.contains("{target_explanation}"));
  }

  #[test]
  fn mode_deserializes_from_snake_case() {
    let m: MentorMode = serde_json::from_str("\"explain\"").unwrap();
    assert_eq!(m, MentorMode::Explain);
    let mut rng = StdRng::seed_from_u64(1);
    assert!(HINTS.contains(&respond(MentorMode::Hint, &challenge("x", 1), &mut rng).as_str()));
  }
}
