//! Closed dictionaries driving query analysis and expansion.
//!
//! Everything here is a static, ordered table evaluated first-match-wins.
//! All entries are stored in normalized form (lowercase, no diacritics) so
//! they can be matched directly against normalizer output.

/// Canonical concept key → surface variants (inflections, loanwords,
/// category synonyms). Expansion is bidirectional: a hit on the key or any
/// variant pulls in the key and the whole variant set.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("cena", &["ceny", "kolko", "stoji", "price", "eur", "euro", "cennik"]),
    ("produkt", &["tovar", "vyrobok", "polozka", "item", "produkty", "sortiment"]),
    ("dostupny", &["skladom", "dispozicii", "sklade", "available", "dostupnost", "dostupne"]),
    ("zlava", &["akcia", "discount", "sale", "zlacnene", "promo", "kupon", "vypredaj"]),
    ("kupit", &["objednat", "nakupit", "buy", "purchase", "order", "kosik"]),
    ("velkost", &["size", "rozmer", "cislo", "velkosti"]),
    ("farba", &["color", "colour", "odtien", "farby", "farebny"]),
    ("dezodorant", &["deodorant", "deo", "antiperspirant", "dezodoranty"]),
    ("sampon", &["shampoo", "sampony", "vlasovy"]),
    ("kondicioner", &["conditioner", "balzam"]),
    ("sprchovy", &["sprchovaci", "shower"]),
    ("mydlo", &["soap", "mydla"]),
    ("krem", &["cream", "kremy", "emulzia"]),
    ("parfum", &["parfem", "vona", "perfume", "voda toaletna"]),
    ("pasta", &["zubna pasta", "toothpaste"]),
    ("kefka", &["zubna kefka", "toothbrush"]),
    ("plienky", &["plienka", "diapers"]),
    ("opalovanie", &["opalovaci", "spf", "slnko", "sunscreen"]),
    ("holenie", &["holiaci", "zileta", "shaving", "razor"]),
];

/// Brand dictionary. Multi-word phrases are matched before single words;
/// single-word entries of three characters or fewer only match on whole-word
/// boundaries (so "fa" never fires inside "fantasticky").
pub const BRAND_PHRASES: &[&str] = &[
    "old spice",
    "head shoulders",
    "la roche posay",
    "loreal paris",
    "jean paul gaultier",
    "calvin klein",
    "bruno banani",
    "tommy hilfiger",
];

pub const BRAND_WORDS: &[&str] = &[
    "nivea", "dove", "garnier", "vichy", "syoss", "loreal", "rexona", "adidas", "puma",
    "gillette", "colgate", "signal", "listerine", "pantene", "schauma", "palmolive",
    "elseve", "eucerin", "mixa", "astrid", "dermacol", "pampers", "fa", "axe", "bic", "nuk",
];

/// Ordered product-type table, first match wins. More specific entries come
/// before generic ones ("opalovaci krem" before "krem").
pub const PRODUCT_TYPES: &[(&str, &[&str])] = &[
    ("dezodorant", &["dezodorant", "deodorant", "antiperspirant", "deo"]),
    ("sampon", &["sampon", "shampoo"]),
    ("kondicioner", &["kondicioner", "balzam na vlasy"]),
    ("sprchovy gel", &["sprchovy gel", "sprchovaci gel", "shower gel"]),
    ("mydlo", &["mydlo", "tekute mydlo"]),
    ("zubna pasta", &["zubna pasta", "pasta na zuby", "toothpaste"]),
    ("zubna kefka", &["zubna kefka", "kefka na zuby"]),
    ("opalovaci krem", &["opalovaci krem", "krem na opalovanie", "spf"]),
    ("krem", &["krem", "cream", "plet"]),
    ("parfum", &["parfum", "parfem", "toaletna voda", "vona"]),
    ("plienky", &["plienky", "plienka"]),
    ("prasok na pranie", &["prasok na pranie", "praci prasok", "pranie"]),
    ("holiaci strojcek", &["holiaci strojcek", "zileta", "holenie"]),
];

/// Types where ranking without a resolved gender is mostly guessing.
pub const GENDER_SENSITIVE_TYPES: &[&str] = &["dezodorant", "parfum", "sprchovy gel", "krem"];

/// Problem/need tags, multi-label.
pub const PROBLEMS: &[(&str, &[&str])] = &[
    ("lupiny", &["lupiny", "proti lupinam", "dandruff"]),
    ("akne", &["akne", "vyrazky", "pupienky", "problematicka plet"]),
    ("sucha pokozka", &["sucha pokozka", "sucha plet", "suche ruky", "suchu pokozku"]),
    ("citliva pokozka", &["citliva pokozka", "citliva plet", "citlivu pokozku", "sensitive"]),
    ("mastne vlasy", &["mastne vlasy", "mastiace sa vlasy"]),
    ("vypadavanie vlasov", &["vypadavanie vlasov", "proti vypadavaniu", "rednutie vlasov"]),
    ("potenie", &["nadmerne potenie", "proti poteniu", "silne potenie"]),
];

/// Preference tags with the product-text patterns that violate them. A
/// violation only counts when the product does not itself carry the
/// preference wording (so "bez parabenov" is not flagged by "paraben").
pub const PREFERENCES: &[(&str, &[&str], &[&str])] = &[
    ("bio", &["bio", "organicky", "organic"], &[]),
    ("vegan", &["vegan", "vegansky"], &[]),
    (
        "bez parfumacie",
        &["bez parfumacie", "bez vone", "neparfumovany", "fragrance free"],
        &["parfumovan"],
    ),
    ("bez parabenov", &["bez parabenov", "paraben free"], &["paraben"]),
    ("prirodny", &["prirodny", "prirodne", "natural"], &[]),
];

pub const DISCOUNT_INTENT: &[&str] = &[
    "zlava", "zlavy", "zlave", "akcia", "akcie", "akcii", "vypredaj", "zlacnene", "promo",
    "sale", "discount", "lacny", "lacne", "najlacnejsi", "kupon",
];

/// Explicit gender phrases. Checked against the full normalized query.
pub const MALE_PATTERNS: &[&str] = &[
    "pre muzov", "pre muza", "pansky", "panske", "muzsky", "muzske", "for men",
];
pub const FEMALE_PATTERNS: &[&str] = &[
    "pre zeny", "pre zenu", "damsky", "damske", "zensky", "zenske", "for women",
];
/// A kids phrase resolves both slots: age group Kids, gender Unisex.
pub const KIDS_PATTERNS: &[&str] = &[
    "pre deti", "pre dieta", "detsky", "detske", "for kids", "baby",
];
pub const SENIOR_PATTERNS: &[&str] = &["pre seniorov", "senior"];
