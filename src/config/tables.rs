//! Compiled-in reference tables used by detection, extraction and formatting.

/// Newspaper and magazine hosts mapped to their publication names
pub const NEWSPAPER_DOMAINS: &[(&str, &str)] = &[
    ("nytimes.com", "The New York Times"),
    ("washingtonpost.com", "The Washington Post"),
    ("wsj.com", "The Wall Street Journal"),
    ("theguardian.com", "The Guardian"),
    ("theatlantic.com", "The Atlantic"),
    ("newyorker.com", "The New Yorker"),
    ("slate.com", "Slate"),
    ("politico.com", "Politico"),
    ("bbc.com", "BBC News"),
    ("reuters.com", "Reuters"),
    ("apnews.com", "Associated Press"),
    ("bloomberg.com", "Bloomberg"),
    ("forbes.com", "Forbes"),
    ("time.com", "Time"),
    ("newsweek.com", "Newsweek"),
    ("vox.com", "Vox"),
    ("vice.com", "Vice"),
    ("wired.com", "Wired"),
    ("cnn.com", "CNN"),
    ("foxnews.com", "Fox News"),
    ("nbcnews.com", "NBC News"),
    ("cbsnews.com", "CBS News"),
    ("abcnews.go.com", "ABC News"),
    ("latimes.com", "Los Angeles Times"),
    ("chicagotribune.com", "Chicago Tribune"),
    ("bostonglobe.com", "The Boston Globe"),
];

/// Government hosts mapped to the issuing agency
pub const GOV_AGENCIES: &[(&str, &str)] = &[
    ("fda.gov", "U.S. Food and Drug Administration"),
    ("cdc.gov", "Centers for Disease Control and Prevention"),
    ("nih.gov", "National Institutes of Health"),
    ("epa.gov", "Environmental Protection Agency"),
    ("regulations.gov", "U.S. Government"),
    ("doe.gov", "U.S. Department of Energy"),
    ("energy.gov", "U.S. Department of Energy"),
    ("whitehouse.gov", "The White House"),
    ("congress.gov", "U.S. Congress"),
    ("supremecourt.gov", "Supreme Court of the United States"),
    ("justice.gov", "U.S. Department of Justice"),
    ("state.gov", "U.S. Department of State"),
    ("treasury.gov", "U.S. Department of the Treasury"),
    ("defense.gov", "U.S. Department of Defense"),
    ("ed.gov", "U.S. Department of Education"),
    ("hhs.gov", "U.S. Department of Health and Human Services"),
    ("dhs.gov", "U.S. Department of Homeland Security"),
    ("usda.gov", "U.S. Department of Agriculture"),
    ("commerce.gov", "U.S. Department of Commerce"),
    ("labor.gov", "U.S. Department of Labor"),
    ("transportation.gov", "U.S. Department of Transportation"),
    ("va.gov", "U.S. Department of Veterans Affairs"),
    ("archives.gov", "National Archives"),
    ("loc.gov", "Library of Congress"),
    ("census.gov", "U.S. Census Bureau"),
    ("bls.gov", "Bureau of Labor Statistics"),
    ("sec.gov", "Securities and Exchange Commission"),
    ("ftc.gov", "Federal Trade Commission"),
    ("fcc.gov", "Federal Communications Commission"),
    ("federalreserve.gov", "Federal Reserve"),
    ("cms.gov", "Centers for Medicare & Medicaid Services"),
    ("samhsa.gov", "Substance Abuse and Mental Health Services Administration"),
    ("nimh.nih.gov", "National Institute of Mental Health"),
    ("ncbi.nlm.nih.gov", "National Center for Biotechnology Information"),
    ("pubmed.gov", "National Library of Medicine"),
];

/// Fallback agency for `.gov` hosts not listed in [`GOV_AGENCIES`]
pub const DEFAULT_GOV_AGENCY: &str = "U.S. Government";

/// Publishers mapped to their place of publication
pub const PUBLISHER_PLACES: &[(&str, &str)] = &[
    ("Harvard University Press", "Cambridge, MA"),
    ("MIT Press", "Cambridge, MA"),
    ("Yale University Press", "New Haven"),
    ("Princeton University Press", "Princeton"),
    ("Stanford University Press", "Stanford"),
    ("University of California Press", "Berkeley"),
    ("University of Chicago Press", "Chicago"),
    ("Columbia University Press", "New York"),
    ("Oxford University Press", "Oxford"),
    ("Cambridge University Press", "Cambridge"),
    ("Penguin", "New York"),
    ("Random House", "New York"),
    ("HarperCollins", "New York"),
    ("Simon & Schuster", "New York"),
    ("Farrar, Straus and Giroux", "New York"),
    ("W. W. Norton", "New York"),
    ("Knopf", "New York"),
    ("Routledge", "London"),
    ("Bloomsbury", "London"),
    ("Sage Publications", "Thousand Oaks"),
    ("Wiley", "Hoboken"),
    ("Springer", "New York"),
    ("Elsevier", "Amsterdam"),
    ("Taylor & Francis", "London"),
    ("Palgrave Macmillan", "London"),
    ("Duke University Press", "Durham"),
    ("Johns Hopkins University Press", "Baltimore"),
    ("University of Pennsylvania Press", "Philadelphia"),
    ("Cornell University Press", "Ithaca"),
    ("University of Michigan Press", "Ann Arbor"),
    ("University of North Carolina Press", "Chapel Hill"),
    ("University of Texas Press", "Austin"),
    ("University of Wisconsin Press", "Madison"),
    ("Indiana University Press", "Bloomington"),
    ("Northwestern University Press", "Evanston"),
    ("Basic Books", "New York"),
    ("Free Press", "New York"),
    ("Vintage", "New York"),
    ("Anchor Books", "New York"),
];

/// Hosts whose URLs are treated as legal sources
pub const LEGAL_DOMAINS: &[&str] = &[
    "courtlistener.com",
    "oyez.org",
    "case.law",
    "justia.com",
    "supremecourt.gov",
    "law.cornell.edu",
    "findlaw.com",
    "heinonline.org",
    "westlaw.com",
    "lexisnexis.com",
];

/// Academic hosts used to name the venue of web search hits
pub const ACADEMIC_DOMAINS: &[(&str, &str)] = &[
    ("jstor.org", "JSTOR"),
    ("academic.oup.com", "Oxford Academic"),
    ("oup.com", "Oxford University Press"),
    ("cambridge.org", "Cambridge University Press"),
    ("tandfonline.com", "Taylor & Francis"),
    ("springer.com", "Springer"),
    ("wiley.com", "Wiley"),
    ("sagepub.com", "SAGE"),
    ("muse.jhu.edu", "Project MUSE"),
    ("sciencedirect.com", "ScienceDirect"),
    ("pubmed.ncbi.nlm.nih.gov", "PubMed"),
    ("hathitrust.org", "HathiTrust"),
    ("archive.org", "Internet Archive"),
    ("worldcat.org", "WorldCat"),
];

/// Vocabulary counted by the medical detection rule
pub const MEDICAL_TERMS: &[&str] = &[
    "clinical",
    "patient",
    "treatment",
    "therapy",
    "diagnosis",
    "disease",
    "syndrome",
    "pharmaceutical",
    "drug",
    "medicine",
    "medical",
    "hospital",
    "physician",
    "pubmed",
    "ncbi",
    "randomized",
    "placebo",
    "trial",
    "efficacy",
    "dosage",
    "pathology",
    "prognosis",
    "etiology",
    "symptom",
    "chronic",
    "acute",
    "disorder",
    "condition",
    "intervention",
    "outcome",
];

/// Court names mapped to their Bluebook abbreviation. An empty abbreviation means the
/// reporter already identifies the court.
pub const COURT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("Supreme Court of the United States", ""),
    ("United States Supreme Court", ""),
    ("SCOTUS", ""),
    ("Supreme Court of Virginia", "Va."),
    ("Virginia Supreme Court", "Va."),
    ("Court of Appeals of Virginia", "Va. Ct. App."),
    ("Supreme Court of California", "Cal."),
    ("Supreme Court of New York", "N.Y. Sup. Ct."),
    ("Court of Appeals of New York", "N.Y."),
    ("Supreme Court of New Jersey", "N.J."),
    ("Supreme Court of Texas", "Tex."),
    ("Bankruptcy Court", "Bankr."),
    ("District Court", "D."),
    ("Court of Appeals", "Cir."),
    ("Supreme Court", "S. Ct."),
];

/// Case reporter abbreviations, written without spaces. A series suffix ("2d", "3d")
/// is not part of the abbreviation.
pub const REPORTERS: &[&str] = &[
    // federal
    "U.S.", "S.Ct.", "L.Ed.", "F.", "F.Supp.", "F.R.D.", "B.R.", "Fed.Cl.", "T.C.", "M.J.",
    // regional
    "A.", "P.", "N.E.", "N.W.", "S.E.", "S.W.", "So.",
    // state
    "N.Y.", "N.Y.S.", "A.D.", "Misc.", "Cal.", "Cal.App.", "Cal.Rptr.", "Ill.", "Ill.App.",
    "Mass.", "Va.", "Pa.", "N.J.", "Tex.", "Mich.", "Wis.", "Wash.", "Md.", "Conn.", "Ga.",
    "Mo.", "Minn.", "Kan.", "Ky.", "Tenn.", "N.C.", "S.C.", "Ariz.", "Colo.", "Or.",
];

/// Newspaper names mapped to their Bluebook abbreviation
pub const NEWSPAPER_ABBREVIATIONS: &[(&str, &str)] = &[
    ("The New York Times", "N.Y. Times"),
    ("New York Times", "N.Y. Times"),
    ("The Washington Post", "Wash. Post"),
    ("Washington Post", "Wash. Post"),
    ("The Wall Street Journal", "Wall St. J."),
    ("Wall Street Journal", "Wall St. J."),
    ("Los Angeles Times", "L.A. Times"),
    ("The Guardian", "Guardian"),
];

/// Strip a leading "www." and lowercase
fn bare_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Whether `host` is `domain` or one of its subdomains
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = bare_host(host);
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Most specific table entry whose domain matches `host`
fn lookup_domain<'a>(table: &'a [(&'a str, &'a str)], host: &str) -> Option<&'a str> {
    table
        .iter()
        .filter(|(domain, _)| host_matches(host, domain))
        .max_by_key(|(domain, _)| domain.len())
        .map(|(_, name)| *name)
}

/// Publication name for a newspaper host
pub fn newspaper_name(host: &str) -> Option<&'static str> {
    lookup_domain(NEWSPAPER_DOMAINS, host)
}

/// Agency name for a government host, falling back to [`DEFAULT_GOV_AGENCY`]
pub fn gov_agency(host: &str) -> &'static str {
    lookup_domain(GOV_AGENCIES, host).unwrap_or(DEFAULT_GOV_AGENCY)
}

/// Venue name for an academic host
pub fn academic_venue(host: &str) -> Option<&'static str> {
    lookup_domain(ACADEMIC_DOMAINS, host)
}

/// Whether `host` belongs to a legal research site
pub fn is_legal_host(host: &str) -> bool {
    LEGAL_DOMAINS.iter().any(|domain| host_matches(host, domain))
}

/// Place of publication for a known publisher (case-insensitive substring match)
pub fn publisher_place(publisher: &str) -> Option<&'static str> {
    let publisher = publisher.to_lowercase();
    if publisher.trim().is_empty() {
        return None;
    }
    PUBLISHER_PLACES
        .iter()
        .find(|(name, _)| publisher.contains(&name.to_lowercase()))
        .map(|(_, place)| *place)
}

/// Bluebook abbreviation for a court name; `Some("")` when no court should be shown
pub fn court_abbreviation(court: &str) -> Option<&'static str> {
    let court = court.to_lowercase();
    COURT_ABBREVIATIONS
        .iter()
        .filter(|(full, _)| court.contains(&full.to_lowercase()))
        .max_by_key(|(full, _)| full.len())
        .map(|(_, abbrev)| *abbrev)
}

/// Whether `abbreviation` ("S. Ct.", "F. Supp.") names a known case reporter
pub fn is_reporter(abbreviation: &str) -> bool {
    let compact: String = abbreviation.split_whitespace().collect();
    REPORTERS.contains(&compact.as_str())
}

/// Bluebook abbreviation for a newspaper name
pub fn newspaper_abbreviation(name: &str) -> Option<&'static str> {
    NEWSPAPER_ABBREVIATIONS
        .iter()
        .find(|(full, _)| full.eq_ignore_ascii_case(name.trim()))
        .map(|(_, abbrev)| *abbrev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_lookup() {
        assert!(is_reporter("U.S."));
        assert!(is_reporter("S. Ct. "));
        assert!(is_reporter("F. Supp."));
        assert!(!is_reporter("Am. Econ. Rev."));
        assert!(!is_reporter("Mar."));
        assert!(!is_reporter("Fed. Reg."));
    }

    #[test]
    fn test_newspaper_lookup() {
        assert_eq!(newspaper_name("www.nytimes.com"), Some("The New York Times"));
        assert_eq!(newspaper_name("abcnews.go.com"), Some("ABC News"));
        assert_eq!(newspaper_name("example.com"), None);
        // "time.com" must not match arbitrary hosts ending in "time.com"
        assert_eq!(newspaper_name("bedtime.com"), None);
    }

    #[test]
    fn test_gov_agency_prefers_most_specific() {
        assert_eq!(gov_agency("www.nimh.nih.gov"), "National Institute of Mental Health");
        assert_eq!(gov_agency("nih.gov"), "National Institutes of Health");
        assert_eq!(gov_agency("fed.gov"), DEFAULT_GOV_AGENCY);
        assert_eq!(gov_agency("unknown.gov"), DEFAULT_GOV_AGENCY);
    }

    #[test]
    fn test_publisher_place() {
        assert_eq!(publisher_place("Yale University Press"), Some("New Haven"));
        assert_eq!(publisher_place("mit press"), Some("Cambridge, MA"));
        assert_eq!(publisher_place("Obscure Press"), None);
        assert_eq!(publisher_place(""), None);
    }

    #[test]
    fn test_court_abbreviation() {
        assert_eq!(court_abbreviation("Supreme Court of Virginia"), Some("Va."));
        assert_eq!(court_abbreviation("Supreme Court of the United States"), Some(""));
        assert_eq!(court_abbreviation("Court of Appeals of New York"), Some("N.Y."));
        assert_eq!(court_abbreviation("2d Cir."), None);
    }

    #[test]
    fn test_legal_hosts() {
        assert!(is_legal_host("www.law.cornell.edu"));
        assert!(is_legal_host("supreme.justia.com"));
        assert!(!is_legal_host("example.com"));
    }

    #[test]
    fn test_newspaper_abbreviation() {
        assert_eq!(newspaper_abbreviation("the new york times"), Some("N.Y. Times"));
        assert_eq!(newspaper_abbreviation("Slate"), None);
    }
}
