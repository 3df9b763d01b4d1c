//! Offline lookup of landmark cases.
//!
//! The table is compiled in and read-only. Queries are matched exactly, then through
//! short-name aliases ("Roe", "Miranda"), then by normalized Levenshtein similarity.
//! A hit is returned with confidence 1.0 and no network call is made.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::detect::strip_reporter_citations;
use crate::models::{extra, CanonicalRecord, LookupQuery, ProviderResult, ReferenceType};
use crate::sources::{Source, SourceCapabilities, SourceError};

const SCOTUS: &str = "Supreme Court of the United States";

/// A landmark case in the offline table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FamousCase {
    /// Normalized lookup key ("loving v virginia")
    pub key: &'static str,
    pub case_name: &'static str,
    pub citation: &'static str,
    pub year: i32,
    pub court: &'static str,
    pub jurisdiction: &'static str,
}

impl FamousCase {
    /// The case as a legal record
    pub fn record(&self) -> CanonicalRecord {
        CanonicalRecord::builder(ReferenceType::Legal)
            .title(self.case_name)
            .court(self.court)
            .year(self.year)
            .extra(extra::REPORTER_CITATION, self.citation)
            .extra(extra::JURISDICTION, self.jurisdiction)
            .build()
    }
}

macro_rules! case {
    ($key:expr, $name:expr, $cite:expr, $year:expr, $court:expr) => {
        FamousCase {
            key: $key,
            case_name: $name,
            citation: $cite,
            year: $year,
            court: $court,
            jurisdiction: "US",
        }
    };
}

/// Landmark cases, in lookup order
pub const FAMOUS_CASES: &[FamousCase] = &[
    // Foundational
    case!("marbury v madison", "Marbury v. Madison", "5 U.S. 137", 1803, SCOTUS),
    case!("mcculloch v maryland", "McCulloch v. Maryland", "17 U.S. 316", 1819, SCOTUS),
    case!("gibbons v ogden", "Gibbons v. Ogden", "22 U.S. 1", 1824, SCOTUS),
    case!("dred scott v sandford", "Dred Scott v. Sandford", "60 U.S. 393", 1857, SCOTUS),
    case!("plessy v ferguson", "Plessy v. Ferguson", "163 U.S. 537", 1896, SCOTUS),
    case!("lochner v new york", "Lochner v. New York", "198 U.S. 45", 1905, SCOTUS),
    case!("jacobson v massachusetts", "Jacobson v. Massachusetts", "197 U.S. 11", 1905, SCOTUS),
    case!("buck v bell", "Buck v. Bell", "274 U.S. 200", 1927, SCOTUS),
    case!("schenck v united states", "Schenck v. United States", "249 U.S. 47", 1919, SCOTUS),
    case!("korematsu v united states", "Korematsu v. United States", "323 U.S. 214", 1944, SCOTUS),
    case!("west virginia v barnette", "West Virginia State Bd. of Educ. v. Barnette", "319 U.S. 624", 1943, SCOTUS),
    case!("youngstown v sawyer", "Youngstown Sheet & Tube Co. v. Sawyer", "343 U.S. 579", 1952, SCOTUS),
    // Civil rights era
    case!("brown v board", "Brown v. Board of Education", "347 U.S. 483", 1954, SCOTUS),
    case!("brown v board of education", "Brown v. Board of Education", "347 U.S. 483", 1954, SCOTUS),
    case!("mapp v ohio", "Mapp v. Ohio", "367 U.S. 643", 1961, SCOTUS),
    case!("baker v carr", "Baker v. Carr", "369 U.S. 186", 1962, SCOTUS),
    case!("engel v vitale", "Engel v. Vitale", "370 U.S. 421", 1962, SCOTUS),
    case!("gideon v wainwright", "Gideon v. Wainwright", "372 U.S. 335", 1963, SCOTUS),
    case!("nyt v sullivan", "New York Times Co. v. Sullivan", "376 U.S. 254", 1964, SCOTUS),
    case!("new york times v sullivan", "New York Times Co. v. Sullivan", "376 U.S. 254", 1964, SCOTUS),
    case!("reynolds v sims", "Reynolds v. Sims", "377 U.S. 533", 1964, SCOTUS),
    case!("griswold v connecticut", "Griswold v. Connecticut", "381 U.S. 479", 1965, SCOTUS),
    case!("loving v virginia", "Loving v. Virginia", "388 U.S. 1", 1967, SCOTUS),
    case!("miranda v arizona", "Miranda v. Arizona", "384 U.S. 436", 1966, SCOTUS),
    case!("katz v united states", "Katz v. United States", "389 U.S. 347", 1967, SCOTUS),
    case!("terry v ohio", "Terry v. Ohio", "392 U.S. 1", 1968, SCOTUS),
    case!("tinker v des moines", "Tinker v. Des Moines Indep. Community School Dist.", "393 U.S. 503", 1969, SCOTUS),
    case!("brandenburg v ohio", "Brandenburg v. Ohio", "395 U.S. 444", 1969, SCOTUS),
    case!("new york times v united states", "New York Times Co. v. United States", "403 U.S. 713", 1971, SCOTUS),
    // 1970s-1980s
    case!("roe v wade", "Roe v. Wade", "410 U.S. 113", 1973, SCOTUS),
    case!("wisconsin v yoder", "Wisconsin v. Yoder", "406 U.S. 205", 1972, SCOTUS),
    case!("furman v georgia", "Furman v. Georgia", "408 U.S. 238", 1972, SCOTUS),
    case!("united states v nixon", "United States v. Nixon", "418 U.S. 683", 1974, SCOTUS),
    case!("gregg v georgia", "Gregg v. Georgia", "428 U.S. 153", 1976, SCOTUS),
    case!("regents v bakke", "Regents of the University of California v. Bakke", "438 U.S. 265", 1978, SCOTUS),
    case!("chevron v nrdc", "Chevron U.S.A. Inc. v. Natural Resources Defense Council, Inc.", "467 U.S. 837", 1984, SCOTUS),
    case!("strickland v washington", "Strickland v. Washington", "466 U.S. 668", 1984, SCOTUS),
    case!("hustler magazine v falwell", "Hustler Magazine, Inc. v. Falwell", "485 U.S. 46", 1988, SCOTUS),
    case!("texas v johnson", "Texas v. Johnson", "491 U.S. 397", 1989, SCOTUS),
    case!("cruzan v director", "Cruzan v. Director, Missouri Dept. of Health", "497 U.S. 261", 1990, SCOTUS),
    case!("planned parenthood v casey", "Planned Parenthood of Southeastern Pa. v. Casey", "505 U.S. 833", 1992, SCOTUS),
    case!("daubert v merrell dow", "Daubert v. Merrell Dow Pharmaceuticals, Inc.", "509 U.S. 579", 1993, SCOTUS),
    case!("united states v lopez", "United States v. Lopez", "514 U.S. 549", 1995, SCOTUS),
    case!("washington v glucksberg", "Washington v. Glucksberg", "521 U.S. 702", 1997, SCOTUS),
    // Modern era
    case!("bush v gore", "Bush v. Gore", "531 U.S. 98", 2000, SCOTUS),
    case!("atkins v virginia", "Atkins v. Virginia", "536 U.S. 304", 2002, SCOTUS),
    case!("lawrence v texas", "Lawrence v. Texas", "539 U.S. 558", 2003, SCOTUS),
    case!("roper v simmons", "Roper v. Simmons", "543 U.S. 551", 2005, SCOTUS),
    case!("kelo v new london", "Kelo v. City of New London", "545 U.S. 469", 2005, SCOTUS),
    case!("dc v heller", "District of Columbia v. Heller", "554 U.S. 570", 2008, SCOTUS),
    case!("district of columbia v heller", "District of Columbia v. Heller", "554 U.S. 570", 2008, SCOTUS),
    case!("citizens united v fec", "Citizens United v. FEC", "558 U.S. 310", 2010, SCOTUS),
    case!("shelby county v holder", "Shelby County v. Holder", "570 U.S. 529", 2013, SCOTUS),
    case!("united states v windsor", "United States v. Windsor", "570 U.S. 744", 2013, SCOTUS),
    case!("obergefell v hodges", "Obergefell v. Hodges", "576 U.S. 644", 2015, SCOTUS),
    case!("montgomery v louisiana", "Montgomery v. Louisiana", "577 U.S. 190", 2016, SCOTUS),
    case!("dobbs v jackson", "Dobbs v. Jackson Women's Health Organization", "597 U.S. 215", 2022, SCOTUS),
    // State courts
    case!("palsgraf v lirr", "Palsgraf v. Long Island R.R. Co.", "248 N.Y. 339", 1928, "N.Y."),
    case!("macpherson v buick", "MacPherson v. Buick Motor Co.", "217 N.Y. 382", 1916, "N.Y."),
    case!("tarasoff v regents", "Tarasoff v. Regents of the University of California", "17 Cal. 3d 425", 1976, "Cal."),
    case!("in re quinlan", "In re Quinlan", "355 A.2d 647", 1976, "N.J."),
    case!("greenspan v osheroff", "Greenspan v. Osheroff", "232 Va. 388", 1986, "Supreme Court of Virginia"),
    // Federal circuit and district
    case!("united states v carroll towing", "United States v. Carroll Towing Co.", "159 F.2d 169", 1947, "2d Cir."),
    case!("canterbury v spence", "Canterbury v. Spence", "464 F.2d 772", 1972, "D.C. Cir."),
    case!("kitzmiller v dover", "Kitzmiller v. Dover Area School Dist.", "400 F. Supp. 2d 707", 2005, "M.D. Pa."),
];

/// Short names people search by, mapped to table keys
const ALIASES: &[(&str, &str)] = &[
    ("dobbs", "dobbs v jackson"),
    ("obergefell", "obergefell v hodges"),
    ("citizens united", "citizens united v fec"),
    ("heller", "dc v heller"),
    ("dred scott", "dred scott v sandford"),
    ("miranda", "miranda v arizona"),
    ("roe", "roe v wade"),
    ("brown", "brown v board"),
    ("loving", "loving v virginia"),
    ("marbury", "marbury v madison"),
    ("chevron", "chevron v nrdc"),
    ("griswold", "griswold v connecticut"),
    ("gideon", "gideon v wainwright"),
    ("mapp", "mapp v ohio"),
    ("tinker", "tinker v des moines"),
    ("lawrence", "lawrence v texas"),
    ("bush", "bush v gore"),
    ("bakke", "regents v bakke"),
    ("nixon", "united states v nixon"),
    ("korematsu", "korematsu v united states"),
    ("schenck", "schenck v united states"),
    ("plessy", "plessy v ferguson"),
    ("lochner", "lochner v new york"),
    ("palsgraf", "palsgraf v lirr"),
    ("tarasoff", "tarasoff v regents"),
    ("quinlan", "in re quinlan"),
    ("osheroff", "greenspan v osheroff"),
    ("casey", "planned parenthood v casey"),
    ("daubert", "daubert v merrell dow"),
    ("youngstown", "youngstown v sawyer"),
    ("glucksberg", "washington v glucksberg"),
    ("cruzan", "cruzan v director"),
    ("kelo", "kelo v new london"),
    ("barnette", "west virginia v barnette"),
];

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static VERSUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:vs|versus)\b").unwrap());

/// Lookup key for a case query: "Loving v. Virginia, 388 U.S. 1 (1967)" -> "loving v virginia"
pub fn normalize_case_key(query: &str) -> String {
    let text = strip_reporter_citations(query);
    let text = PARENTHETICAL.replace_all(&text, " ").to_lowercase();
    let text: String = text.chars().filter(|c| !".,:;".contains(*c)).collect();
    let text = VERSUS.replace_all(&text, "v");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn by_key(key: &str) -> Option<&'static FamousCase> {
    FAMOUS_CASES.iter().find(|case| case.key == key)
}

fn fuzzy_cutoff(key: &str) -> f64 {
    if key.chars().count() < 15 {
        0.75
    } else {
        0.8
    }
}

/// Minimum similarity of each party name on its own
const PARTY_CUTOFF: f64 = 0.85;

/// Whether two party names are plausibly the same party misspelled
///
/// The first letter must agree, so "Dixon" never stands in for "Nixon".
fn same_party(query: &str, entry: &str) -> bool {
    if query == entry {
        return true;
    }
    query.chars().next() == entry.chars().next()
        && strsim::normalized_levenshtein(query, entry) >= PARTY_CUTOFF
}

/// Whether `key` is a misspelling of `entry`, compared party by party
fn parties_line_up(key: &str, entry: &str) -> bool {
    match (key.split_once(" v "), entry.split_once(" v ")) {
        (Some((key_left, key_right)), Some((entry_left, entry_right))) => {
            same_party(key_left, entry_left) && same_party(key_right, entry_right)
        }
        (None, None) => same_party(key, entry),
        _ => false,
    }
}

/// Find a landmark case for `query`: exact key, then alias, then closest key
pub fn lookup(query: &str) -> Option<&'static FamousCase> {
    let key = normalize_case_key(query);
    if key.is_empty() {
        return None;
    }

    if let Some(case) = by_key(&key) {
        return Some(case);
    }

    let alias_hit = ALIASES.iter().find(|(alias, _)| {
        key == *alias || (key.starts_with(&format!("{} ", alias)) && !key.contains(" v "))
    });
    if let Some((_, target)) = alias_hit {
        return by_key(target);
    }

    let cutoff = fuzzy_cutoff(&key);
    let mut best: Option<(&'static FamousCase, f64)> = None;
    for case in FAMOUS_CASES {
        let score = strsim::normalized_levenshtein(&key, case.key);
        if score >= cutoff
            && parties_line_up(&key, case.key)
            && best.map_or(true, |(_, top)| score > top)
        {
            best = Some((case, score));
        }
    }
    best.map(|(case, _)| case)
}

/// Offline landmark-case provider
#[derive(Debug, Clone, Default)]
pub struct FamousCasesSource;

impl FamousCasesSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Source for FamousCasesSource {
    fn id(&self) -> &str {
        "famous_cases"
    }

    fn name(&self) -> &str {
        "Famous Cases"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::OFFLINE
    }

    async fn search(&self, query: &LookupQuery) -> Result<ProviderResult, SourceError> {
        match lookup(&query.text) {
            Some(case) => {
                tracing::debug!("Famous case hit: {} -> {}", query.text, case.case_name);
                Ok(ProviderResult::matched(self.id(), case.record(), 1.0))
            }
            None => Ok(ProviderResult::no_match(self.id())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_key() {
        assert_eq!(normalize_case_key("Loving v. Virginia"), "loving v virginia");
        assert_eq!(
            normalize_case_key("Loving v. Virginia, 388 U.S. 1 (1967)"),
            "loving v virginia"
        );
        assert_eq!(normalize_case_key("Roe versus Wade"), "roe v wade");
        assert_eq!(normalize_case_key("Bush vs. Gore"), "bush v gore");
        assert_eq!(normalize_case_key("   "), "");
    }

    #[test]
    fn test_exact_and_alias_lookup() {
        assert_eq!(lookup("Loving v. Virginia").unwrap().citation, "388 U.S. 1");
        assert_eq!(lookup("Brown v. Board").unwrap().year, 1954);
        assert_eq!(lookup("Miranda").unwrap().case_name, "Miranda v. Arizona");
        assert_eq!(lookup("roe decision").unwrap().key, "roe v wade");
    }

    #[test]
    fn test_alias_does_not_capture_other_cases() {
        // "brown v kansas" is a different case; the alias must not swallow it
        let hit = lookup("Brown v. Kansas City Southern");
        assert!(hit.map_or(true, |case| case.key != "brown v board"));
    }

    #[test]
    fn test_fuzzy_lookup() {
        assert_eq!(lookup("Obergefel v. Hodges").unwrap().key, "obergefell v hodges");
        assert_eq!(lookup("Griswold v Conecticut").unwrap().key, "griswold v connecticut");
        assert!(lookup("Smith v. Jones").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_near_miss_real_cases_are_not_landmarks() {
        // United States v. Dixon, 509 U.S. 688 (1993)
        assert!(lookup("United States v. Dixon").is_none());
        // Schenck v. Pro-Choice Network, 519 U.S. 357 (1997)
        assert!(lookup("Schenck v. Pro-Choice Network").is_none());
        // Bush v. Vera, 517 U.S. 952 (1996)
        assert!(lookup("Bush v. Vera").is_none());
        assert!(lookup("Rush v. Gore").is_none());
    }

    #[test]
    fn test_party_misspellings_still_match() {
        assert_eq!(lookup("Schenk v. United States").unwrap().key, "schenck v united states");
        assert_eq!(lookup("Gideon v. Wainright").unwrap().key, "gideon v wainwright");
        assert!(!parties_line_up("united states v dixon", "united states v nixon"));
        assert!(parties_line_up("in re quinlen", "in re quinlan"));
    }

    #[test]
    fn test_table_covers_landmark_set() {
        assert!(FAMOUS_CASES.len() >= 60);
        assert_eq!(lookup("Terry v. Ohio, 392 U.S. 1 (1968)").unwrap().year, 1968);
        assert_eq!(lookup("Planned Parenthood v. Casey").unwrap().citation, "505 U.S. 833");
        assert_eq!(lookup("Daubert").unwrap().citation, "509 U.S. 579");
        assert_eq!(lookup("Canterbury v. Spence").unwrap().court, "D.C. Cir.");
        assert_eq!(
            lookup("New York Times v. United States").unwrap().citation,
            "403 U.S. 713"
        );
        for (_, target) in ALIASES {
            assert!(by_key(target).is_some(), "alias target {target} missing");
        }
    }

    #[test]
    fn test_table_keys_are_normalized() {
        for case in FAMOUS_CASES {
            assert_eq!(normalize_case_key(case.key), case.key);
            assert!(case.record().has_minimum_data());
        }
    }

    #[tokio::test]
    async fn test_search_confidence() {
        let source = FamousCasesSource::new();
        let hit = source
            .search(&LookupQuery::new("Loving v. Virginia", ReferenceType::Legal))
            .await
            .unwrap();
        assert!(hit.matched);
        assert_eq!(hit.confidence, 1.0);
        let record = hit.record.unwrap();
        assert_eq!(record.extra(extra::REPORTER_CITATION), Some("388 U.S. 1"));
        assert_eq!(record.year(), Some(1967));

        let miss = source
            .search(&LookupQuery::new("caplan trains brains", ReferenceType::Legal))
            .await
            .unwrap();
        assert!(!miss.matched);
    }
}
