use std::io::Write;

use super::ansi;

/// Prompt for a plain value. An empty answer falls back to `default`
/// when one is given, otherwise the question repeats.
pub fn ask(label: &str, default: Option<&str>) -> String {
    loop {
        match default {
            Some(d) => print!("  {} [{}]: ", label, ansi::dim(d)),
            None => print!("  {label}: "),
        }
        std::io::stdout().flush().expect("Failed to flush stdout");

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .expect("Failed to read stdin");
        let answer = line.trim();

        if !answer.is_empty() {
            return answer.to_string();
        }
        if let Some(d) = default {
            return d.to_string();
        }
        println!("  {} A value is required", ansi::red("!"));
    }
}

/// Prompt for a secret without echoing it to the terminal.
pub fn ask_secret(label: &str) -> String {
    loop {
        let secret = rpassword::prompt_password(format!("  {label} (hidden): "))
            .expect("Failed to read secret");
        let secret = secret.trim();
        if !secret.is_empty() {
            return secret.to_string();
        }
        println!("  {} A value is required", ansi::red("!"));
    }
}

/// Yes/no confirmation, defaulting to yes.
pub fn confirm(question: &str) -> bool {
    print!("  {} [Y/n]: ", question);
    std::io::stdout().flush().expect("Failed to flush stdout");

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .expect("Failed to read stdin");

    !matches!(line.trim().to_lowercase().as_str(), "n" | "no")
}
