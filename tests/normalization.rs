use wc_reconcile::config::ReferenceTables;
use wc_reconcile::record::{MatchResult, Round, UNKNOWN_NAME};
use wc_reconcile::score::parse_score_text;
use wc_reconcile::transform::Normalizers;

fn norm() -> Normalizers {
    Normalizers::from_tables(&ReferenceTables::builtin())
}

#[test]
fn plain_score_gives_a_home_win() {
    let (home, away) = parse_score_text("2-1");
    assert_eq!((home, away), (Some(2), Some(1)));
    assert_eq!(MatchResult::from_scores(home, away), MatchResult::HomeWin);
}

#[test]
fn garbage_score_gives_unknown() {
    let (home, away) = parse_score_text("invalid");
    assert_eq!((home, away), (None, None));
    assert_eq!(MatchResult::from_scores(home, away), MatchResult::Unknown);
}

#[test]
fn score_text_variants() {
    assert_eq!(parse_score_text("3–2"), (Some(3), Some(2)));
    assert_eq!(parse_score_text(" 0 - 0 "), (Some(0), Some(0)));
    assert_eq!(parse_score_text("1:1"), (Some(1), Some(1)));
    assert_eq!(parse_score_text("4-2 (a.e.t.)"), (Some(4), Some(2)));
    assert_eq!(parse_score_text(""), (None, None));
    assert_eq!(parse_score_text("w/o"), (None, None));
}

#[test]
fn result_follows_scores() {
    let cases = [
        ((Some(2), Some(1)), MatchResult::HomeWin),
        ((Some(0), Some(3)), MatchResult::AwayWin),
        ((Some(1), Some(1)), MatchResult::Draw),
        ((Some(1), None), MatchResult::Unknown),
        ((None, None), MatchResult::Unknown),
    ];
    for ((home, away), expected) in cases {
        assert_eq!(MatchResult::from_scores(home, away), expected, "{home:?}-{away:?}");
    }
}

#[test]
fn historical_names_map_to_successors() {
    let norm = norm();
    assert_eq!(norm.teams.normalize(Some("West Germany")), "Germany");
    assert_eq!(norm.teams.normalize(Some("Soviet Union")), "Russia");
    assert_eq!(norm.cities.normalize(Some("PARIS")), "Paris");
    assert_eq!(norm.teams.normalize(Some("")), UNKNOWN_NAME);
    assert_eq!(norm.teams.normalize(None), UNKNOWN_NAME);
}

#[test]
fn name_normalization_is_idempotent() {
    let norm = norm();
    let teams = [
        "West Germany",
        "  korea republic ",
        "UNITED STATES",
        "C\u{fffd}te d'Ivoire",
        "Trinidad & Tobago",
        "IR Iran",
        "Bosnia-Herzegovina",
        "Germany FR",
        "",
        "Nowhere United",
        "ß",
        "İSTANBUL",
    ];
    for raw in teams {
        let once = norm.teams.normalize(Some(raw));
        assert_eq!(norm.teams.normalize(Some(&once)), once, "team {raw:?}");
    }
    let cities = ["PARIS", "Sao Paulo", "Saint-Denis", "México", "rio de janeiro", "Al Khor"];
    for raw in cities {
        let once = norm.cities.normalize(Some(raw));
        assert_eq!(norm.cities.normalize(Some(&once)), once, "city {raw:?}");
    }
}

#[test]
fn round_labels_land_in_the_closed_set_or_fail() {
    let norm = norm();
    let labels = [
        ("R16", Some(Round::RoundOf16)),
        ("Quarterfinal", Some(Round::QuarterFinal)),
        ("Match for third place", Some(Round::ThirdPlace)),
        ("Final", Some(Round::Final)),
        ("Group H", Some(Round::GroupStage)),
        ("1/2 finale", Some(Round::SemiFinal)),
        ("round_2_loser", Some(Round::ThirdPlace)),
        ("Second round", None),
        ("Replay", None),
    ];
    for (label, expected) in labels {
        let (round, unmapped) = norm.rounds.classify(Some(label));
        assert_eq!(round, expected, "{label}");
        assert_eq!(unmapped.is_some(), expected.is_none(), "{label}");
        if let Some(round) = round {
            assert!(Round::ALL.contains(&round));
        }
    }
}
