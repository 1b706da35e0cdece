use std::borrow::Cow;

use regex::bytes::{NoExpand, Regex};

/// Sous-chaîne littérale, compilée une fois pour la recherche et le remplacement.
#[derive(Debug, Clone)]
pub struct Literal {
    text: String,
    matcher: Regex,
}

impl Literal {
    /// Compile une sous-chaîne littérale.
    pub fn new(text: impl Into<String>) -> Result<Self, regex::Error> {
        let text = text.into();
        let matcher = Regex::new(&regex::escape(&text))?;
        Ok(Self { text, matcher })
    }

    /// Texte d’origine.
    pub fn as_str(&self) -> &str { &self.text }

    /// Vrai si `haystack` contient la sous-chaîne.
    pub fn is_in(&self, haystack: &[u8]) -> bool { self.matcher.is_match(haystack) }
}

#[derive(Debug, Clone)]
enum Find {
    Literal(Literal),
    Pattern(Regex),
}

/// Règle compilée : recherche + remplacement déjà résolu.
#[derive(Debug, Clone)]
pub struct PatchRule {
    find: Find,
    replacement: Vec<u8>,
}

impl PatchRule {
    /// Règle littérale : chaque occurrence de `find` est remplacée telle quelle.
    pub fn literal(find: &str, replacement: impl Into<Vec<u8>>) -> Result<Self, regex::Error> {
        Ok(Self { find: Find::Literal(Literal::new(find)?), replacement: replacement.into() })
    }

    /// Règle regex : `$1`, `${name}` sont développés dans le remplacement.
    pub fn regex(pattern: &str, replacement: impl Into<Vec<u8>>) -> Result<Self, regex::Error> {
        Ok(Self { find: Find::Pattern(Regex::new(pattern)?), replacement: replacement.into() })
    }

    /// Vrai pour une règle regex.
    pub const fn is_regex(&self) -> bool { matches!(self.find, Find::Pattern(_)) }

    /// Texte de recherche (littéral ou source du motif).
    pub fn find_text(&self) -> &str {
        match &self.find {
            Find::Literal(lit) => lit.as_str(),
            Find::Pattern(re) => re.as_str(),
        }
    }

    /// Remplacement résolu.
    pub fn replacement(&self) -> &[u8] { &self.replacement }

    /// Vrai si la règle s’applique au contenu courant.
    pub fn matches(&self, content: &[u8]) -> bool {
        match &self.find {
            Find::Literal(lit) => lit.is_in(content),
            Find::Pattern(re) => re.is_match(content),
        }
    }

    /// Remplace toutes les occurrences ; `Cow::Borrowed` si rien n’a changé.
    pub fn apply<'c>(&self, content: &'c [u8]) -> Cow<'c, [u8]> {
        match &self.find {
            Find::Literal(lit) => lit.matcher.replace_all(content, NoExpand(&self.replacement)),
            Find::Pattern(re) => re.replace_all(content, self.replacement.as_slice()),
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */
