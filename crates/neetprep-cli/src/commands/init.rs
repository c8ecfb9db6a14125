//! The `neetprep init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("neetprep.toml").exists() {
        println!("neetprep.toml already exists, skipping.");
    } else {
        std::fs::write("neetprep.toml", SAMPLE_CONFIG)?;
        println!("Created neetprep.toml");
    }

    std::fs::create_dir_all("banks")?;
    let sample_path = std::path::Path::new("banks/sample.toml");
    if sample_path.exists() {
        println!("banks/sample.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_BANK)?;
        println!("Created banks/sample.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit neetprep.toml to point at your question API, or keep the local bank");
    println!("  2. Run: neetprep validate --bank banks/sample.toml");
    println!("  3. Run: neetprep take --variant chapter --portion 11 --subject physics --chapter units");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# neetprep configuration

user_id = "learner"
seconds_per_question = 60
show_instructions = true
output_dir = "./neetprep-results"

[marking]
correct = 4
wrong = -1

[catalog]
type = "file"
path = "banks/sample.toml"

# To use the question API instead:
# [catalog]
# type = "http"
# base_url = "https://api.example.com"
#
# [results]
# type = "http"
# base_url = "https://api.example.com"
#
# [auth]
# token = "${NEETPREP_TOKEN}"

[results]
type = "file"
dir = "./neetprep-results"
"#;

const SAMPLE_BANK: &str = r#"[bank]
id = "sample"
name = "Sample Physics Bank"
description = "A few class 11 physics questions to get started"

[[questions]]
id = "phy-units-1"
question = "Which of the following is a fundamental SI unit?"
option_a = "newton"
option_b = "joule"
option_c = "kelvin"
option_d = "watt"
correct_option = "C"
hint = "Temperature is one of the seven base quantities."
question_type_id = "mcq"
subject_id = "physics"
chapter_id = "units"
portion_id = "11"

[[questions]]
id = "phy-units-2"
question = "The dimensional formula of force is"
option_a = "[M L T^-2]"
option_b = "[M L^2 T^-2]"
option_c = "[M L^-1 T^-2]"
option_d = "[M T^-2]"
correct_option = "A"
question_type_id = "mcq"
subject_id = "physics"
chapter_id = "units"
portion_id = "11"

[[questions]]
id = "phy-motion-1"
question = "A body moving with constant velocity has an acceleration of"
option_a = "9.8 m/s^2"
option_b = "zero"
option_c = "1 m/s^2"
option_d = "it depends on the mass"
correct_option = "B"
question_type_id = "mcq"
subject_id = "physics"
chapter_id = "laws-of-motion"
portion_id = "11"
"#;
