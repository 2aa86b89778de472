// Colored terminal output for the `extract` command.

use colored::Colorize;

use super::fit_width;
use crate::aggregate::PersonRecord;

/// How many places to list under each person before summarising the rest.
const MAX_PLACES_SHOWN: usize = 8;

/// Display the people found in a document, most-mentioned first.
pub fn display_people(url: &str, people: &[PersonRecord]) {
    println!(
        "\n{}",
        format!("=== People in {} ===", fit_width(url, 60)).bold()
    );

    if people.is_empty() {
        println!("\nNo people found in this document.");
        return;
    }

    let mut ranked: Vec<&PersonRecord> = people.iter().collect();
    // Stable: ties keep first-mention order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    println!();
    println!(
        "  {:<32} {:>8}  {}",
        "Person".dimmed(),
        "Mentions".dimmed(),
        "Places nearby".dimmed()
    );
    println!("  {}", "-".repeat(78).dimmed());

    for person in ranked {
        println!(
            "  {:<32} {:>8}  {}",
            fit_width(&person.name, 32).bold(),
            person.count,
            format_places(person)
        );
    }

    let total_mentions: u32 = people.iter().map(|p| p.count).sum();
    println!();
    println!(
        "  {} people, {} mentions",
        people.len().to_string().bold(),
        total_mentions
    );
}

fn format_places(person: &PersonRecord) -> String {
    if person.associated_places.is_empty() {
        return "-".dimmed().to_string();
    }

    let mut places: Vec<_> = person.associated_places.iter().collect();
    places.sort_by(|a, b| b.count.cmp(&a.count));

    let mut shown: Vec<String> = places
        .iter()
        .take(MAX_PLACES_SHOWN)
        .map(|p| format!("{} ({})", p.name.cyan(), p.count))
        .collect();
    if places.len() > MAX_PLACES_SHOWN {
        shown.push(format!("+{} more", places.len() - MAX_PLACES_SHOWN).dimmed().to_string());
    }
    shown.join(", ")
}
