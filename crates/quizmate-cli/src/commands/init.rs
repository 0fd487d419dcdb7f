//! The `quizmate init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizmate.toml
    if std::path::Path::new("quizmate.toml").exists() {
        println!("quizmate.toml already exists, skipping.");
    } else {
        std::fs::write("quizmate.toml", SAMPLE_CONFIG)?;
        println!("Created quizmate.toml");
    }

    // Create example bundle
    std::fs::create_dir_all("bundles")?;
    let example_path = std::path::Path::new("bundles/example.json");
    if example_path.exists() {
        println!("bundles/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BUNDLE)?;
        println!("Created bundles/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizmate.toml to pick a recommendation gateway");
    println!("  2. Run: quizmate validate --bundle bundles/example.json");
    println!("  3. Run: quizmate run --bundle bundles/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizmate configuration

# Skip recommendations entirely.
offline = false
# Shuffle questions within each type before the quiz starts.
shuffle = false

# In-process analyzer, no network needed.
[gateway]
type = "local"

# Remote analysis service:
# [gateway]
# type = "http"
# base_url = "http://localhost:8000"
# api_key = "${QUIZMATE_API_KEY}"
# timeout_secs = 30
"#;

const EXAMPLE_BUNDLE: &str = r#"{
  "title": "The Solar System",
  "multiple_choice_questions": [
    {
      "question": "Which planet is closest to the Sun?",
      "options": ["Venus", "Mercury", "Earth", "Mars"],
      "correct_answer": 1,
      "explanation": "Mercury orbits closest to the Sun.",
      "difficulty": "easy",
      "topic": "Planets"
    },
    {
      "question": "What is the largest planet?",
      "options": ["Saturn", "Neptune", "Jupiter"],
      "correct_answer": 2,
      "explanation": "Jupiter is more than twice as massive as all other planets combined.",
      "difficulty": "easy",
      "topic": "Planets"
    }
  ],
  "multi_select_questions": [
    {
      "question": "Which of these are gas giants?",
      "options": ["Jupiter", "Mars", "Saturn", "Venus"],
      "correct_answers": [0, 2],
      "explanation": "Jupiter and Saturn are gas giants; Mars and Venus are rocky.",
      "difficulty": "medium",
      "topic": "Planets",
      "marks": 2
    }
  ],
  "true_false_questions": [
    {
      "question": "The Sun is a star.",
      "correct_answer": true,
      "explanation": "The Sun is a G-type main-sequence star.",
      "difficulty": "easy",
      "topic": "Stars"
    }
  ],
  "flashcards": [
    {"front": "Astronomical unit", "back": "Mean Earth-Sun distance, about 150 million km"}
  ],
  "quiz_mode": {"type": "learning_mode", "time_limit_minutes": 0, "instant_feedback": true}
}
"#;
