use std::fs;
use std::path::PathBuf;

use libertadores_shots::aliases::AliasTable;
use libertadores_shots::attribution::Side;
use libertadores_shots::match_page::{parse_match_page, save_match_csv};
use libertadores_shots::shots::{EventType, read_shots};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_shots_and_attributes_sides() {
    let html = read_fixture("match_page.html");
    let shots = parse_match_page(&html, AliasTable::builtin()).expect("page should parse");

    assert_eq!(shots.home_team, "Peñarol");
    assert_eq!(shots.away_team, "Flamengo");
    assert_eq!(shots.match_round, Some(3));
    assert_eq!(shots.records.len(), 5);

    let sides = shots
        .records
        .iter()
        .map(|r| (r.id, r.side))
        .collect::<Vec<_>>();
    assert_eq!(
        sides,
        vec![
            (1001, Side::Home),
            (1002, Side::Home),
            (1003, Side::Away),
            (1004, Side::Unknown),
            (1005, Side::Away),
        ]
    );

    // Team names keep the provider spelling.
    assert_eq!(shots.records[0].team_name, "CA Penarol");
    assert_eq!(shots.records[4].team_name, "Flamengo");
    assert_eq!(shots.records[0].event_type, EventType::Goal);
    assert!(shots.records.iter().all(|r| r.match_round == 3));
}

#[test]
fn reports_unresolved_and_skipped_shots() {
    let html = read_fixture("match_page.html");
    let shots = parse_match_page(&html, AliasTable::builtin()).expect("page should parse");

    assert_eq!(
        shots.attribution.unresolved.iter().collect::<Vec<_>>(),
        vec!["Flamengo FC"]
    );
    assert_eq!(shots.attribution.missing, 1);
    assert_eq!(shots.errors.len(), 2);
    assert!(shots.errors.iter().any(|e| e.contains("no team for player 404")));
    assert!(shots.collisions.is_empty());
}

#[test]
fn custom_alias_table_resolves_more_names() {
    let html = read_fixture("match_page.html");
    let table = AliasTable::from_pairs(&[
        ("Peñarol", &["CA Penarol"]),
        ("Flamengo", &["CR Flamengo", "Flamengo FC"]),
    ]);
    let shots = parse_match_page(&html, &table).expect("page should parse");
    assert!(shots.attribution.unresolved.is_empty());
    assert!(shots.records.iter().all(|r| r.side != Side::Unknown));
}

#[test]
fn saved_csv_reads_back() {
    let html = read_fixture("match_page.html");
    let shots = parse_match_page(&html, AliasTable::builtin()).expect("page should parse");
    let dir = tempfile::tempdir().expect("tempdir");

    let path = save_match_csv(dir.path(), "penarol-vs-flamengo", &shots.records)
        .expect("csv should save");
    assert!(path.ends_with("penarol-vs-flamengo.csv"));

    let file = fs::File::open(&path).expect("saved file");
    let parsed = read_shots(file).expect("saved csv should parse");
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    assert_eq!(parsed.records, shots.records);
}

#[test]
fn inline_script_reading_next_data_does_not_hide_the_payload() {
    let html = read_fixture("match_page.html").replacen(
        "<script id=\"__NEXT_DATA__\"",
        "<script>var b = window.__NEXT_DATA__ && window.__NEXT_DATA__.buildId;</script>\n<script id=\"__NEXT_DATA__\"",
        1,
    );
    assert!(html.contains("window.__NEXT_DATA__"));
    let shots = parse_match_page(&html, AliasTable::builtin()).expect("page should parse");
    assert_eq!(shots.records.len(), 5);
    assert_eq!(shots.home_team, "Peñarol");
}
