//! Output formatting for CLI

use crate::pipeline::{PlayResult, TrainingResult};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Format a number with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i.is_multiple_of(3) {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

pub fn print_training_result(result: &TrainingResult) {
    print_section("Training summary");
    print_kv("Episodes", &format_number(result.episodes));
    if result.interrupted {
        print_kv("Status", "stopped early");
    }
    print_kv("High score", &format_number(result.high_score));
    print_kv("Average score", &format!("{:.1}", result.average_score));
    print_kv("Average reward", &format!("{:.3}", result.average_reward));
    print_kv("Batch updates", &format_number(result.optimizer_steps));
    print_kv("Final epsilon", &format!("{:.3}", result.final_epsilon));
}

pub fn print_play_result(result: &PlayResult) {
    print_section("Play summary");
    print_kv("Games", &format_number(result.scores.len()));
    print_kv("High score", &format_number(result.high_score));
    print_kv("Average score", &format!("{:.1}", result.average_score));
}
