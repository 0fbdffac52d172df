use libertadores_shots::aliases::{AliasTable, build_side_mapping};
use libertadores_shots::attribution::{Side, attribute};
use libertadores_shots::normalize::normalize;

#[test]
fn normalize_is_idempotent_over_provider_spellings() {
    let samples = [
        "Peñarol",
        "Club Atlético Peñarol",
        "Vélez Sarsfield",
        "Universidad Católica (CHI)",
        "LDU Quito",
        "  Independiente   del Valle ",
        "Grêmio F.B.P.A.",
        "Deportes Iquique",
        "Bolívar",
        "São Paulo FC",
        "Atlético-MG",
        "Ñublense",
        "",
        "   ",
        "123 !!",
    ];
    for raw in samples {
        let once = normalize(raw);
        assert_eq!(normalize(&once), once, "input {raw:?}");
        assert!(!once.starts_with(' ') && !once.ends_with(' '));
        assert!(!once.contains("  "));
        assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
    }
}

#[test]
fn accented_and_plain_spellings_agree() {
    assert_eq!(normalize("Peñarol"), normalize("Penarol"));
    assert_eq!(normalize("Peñarol"), "penarol");
}

#[test]
fn exact_names_only_without_aliases() {
    let mapping = build_side_mapping("Club A", "Club B", &AliasTable::new());
    assert_eq!(attribute(Some("Club A"), &mapping), Side::Home);
    assert_eq!(attribute(Some("Club B"), &mapping), Side::Away);
    assert_eq!(attribute(Some("Club C"), &mapping), Side::Unknown);
}

#[test]
fn alias_spellings_resolve_home() {
    let table = AliasTable::from_pairs(&[("Club A", &["CA", "Club A FC"])]);
    let mapping = build_side_mapping("Club A", "Club B", &table);
    assert_eq!(attribute(Some("CA"), &mapping), Side::Home);
    assert_eq!(attribute(Some("Club A FC"), &mapping), Side::Home);
    assert_eq!(attribute(Some("Club B"), &mapping), Side::Away);
}

#[test]
fn aliases_apply_when_team_plays_away() {
    let table = AliasTable::from_pairs(&[("Club A", &["CA"])]);
    let mapping = build_side_mapping("Club B", "Club A", &table);
    assert_eq!(attribute(Some("CA"), &mapping), Side::Away);
}
