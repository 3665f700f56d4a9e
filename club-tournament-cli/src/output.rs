use club_tournament_core::standings::Standings;
use club_tournament_core::{Slot, Tournament, TournamentMatch};

pub fn print_matches(tournament: &Tournament) {
    for (stage, matches) in tournament.matches_by_stage() {
        println!("== {} ==", stage);
        println!("ID | Round | Time | Home | Away | Score | Status");

        for m in matches {
            println!("{}", format_match(m));
        }

        println!();
    }
}

pub fn print_standings(tournament: &Tournament) {
    for table in tournament.standings() {
        print_table(&table);
    }
}

fn print_table(table: &Standings) {
    match &table.group {
        Some(group) => println!("== Group {} ==", group),
        None => println!("== Standings =="),
    }

    println!("# | {}", table.keys().collect::<Vec<_>>().join(" | "));

    for (rank, record) in table.iter().enumerate() {
        println!(
            "{} | {} | {} | {} | {} | {} | {} | {} | {} | {}",
            rank + 1,
            record.team,
            record.played,
            record.wins,
            record.draws,
            record.losses,
            record.goals_for,
            record.goals_against,
            record.goal_difference(),
            record.points
        );
    }

    println!();
}

fn format_match(m: &TournamentMatch) -> String {
    let time = match m.scheduled_at {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => String::from("-"),
    };

    let score = match m.score {
        Some(score) => format!("{}:{}", score.home, score.away),
        None => String::from("-"),
    };

    format!(
        "{} | {} | {} | {} | {} | {} | {}",
        m.id,
        m.round,
        time,
        format_slot(m.home),
        format_slot(m.away),
        score,
        m.status
    )
}

fn format_slot(slot: Slot) -> String {
    match slot {
        Slot::Team(team) => team.to_string(),
        Slot::Bye => String::from("bye"),
        Slot::Pending => String::from("tbd"),
    }
}
