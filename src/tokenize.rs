use anyhow::{Context, Result};
use regex::Regex;

/// Treebank-style word tokenizer producing lowercase tokens.
///
/// Double quotes become the Treebank quote tokens: ``` `` ``` when opening,
/// `''` when closing.
pub struct Tokenizer {
    leading_quote: Regex,
    backticks: Regex,
    opening_quote: Regex,
    punctuation: Regex,
    comma_colon: Regex,
    trailing_comma_colon: Regex,
    final_period: Regex,
    brackets: Regex,
    double_dash: Regex,
    closing_quote: Regex,
    clitics: Regex,
    contractions: Regex,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            leading_quote: compile(r#"^""#)?,
            backticks: compile(r"``")?,
            opening_quote: compile(r#"([ (\[{<])("|'')"#)?,
            punctuation: compile(r"[;@#$%&?!]|\.\.\.")?,
            comma_colon: compile(r"([:,])([^\d])")?,
            trailing_comma_colon: compile(r"([:,])$")?,
            final_period: compile(r#"([^.])(\.)([\]\)}>"']*)\s*$"#)?,
            brackets: compile(r"[\]\[\(\)\{\}<>]")?,
            double_dash: compile(r"--")?,
            closing_quote: compile(r#"''|""#)?,
            clitics: compile(r"([^' ])('s|'m|'d|') ")?,
            contractions: compile(r"([^' ])('ll|'re|'ve|n't) ")?,
        })
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let text = self.leading_quote.replace(&lowered, "``");
        let text = self.backticks.replace_all(&text, " `` ");
        let text = self.opening_quote.replace_all(&text, "${1} `` ");
        let text = self.punctuation.replace_all(&text, " $0 ");
        let text = self.comma_colon.replace_all(&text, " ${1} ${2}");
        let text = self.trailing_comma_colon.replace_all(&text, " ${1} ");
        let text = self.final_period.replace_all(&text, "${1} ${2}${3} ");
        let text = self.brackets.replace_all(&text, " $0 ");
        let text = self.double_dash.replace_all(&text, " -- ");
        let text = self.closing_quote.replace_all(&text, " '' ");

        let padded = format!(" {text} ");
        let text = self.clitics.replace_all(&padded, "${1} ${2} ");
        let text = self.contractions.replace_all(&text, "${1} ${2} ");

        text.split_whitespace().map(ToOwned::to_owned).collect()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("failed to compile tokenizer regex: {pattern}"))
}

#[cfg(test)]
mod tests {
    use super::Tokenizer;

    fn tokenize(text: &str) -> Vec<String> {
        Tokenizer::new()
            .expect("tokenizer regexes should compile")
            .tokenize(text)
    }

    #[test]
    fn lowercases_and_splits_on_whitespace() {
        assert_eq!(tokenize("X is  Y"), vec!["x", "is", "y"]);
    }

    #[test]
    fn separates_punctuation_and_final_period() {
        assert_eq!(
            tokenize("Paris, France is big; really?"),
            vec!["paris", ",", "france", "is", "big", ";", "really", "?"]
        );
        assert_eq!(tokenize("It ended in 1999."), vec!["it", "ended", "in", "1999", "."]);
    }

    #[test]
    fn keeps_digit_grouping_commas() {
        assert_eq!(tokenize("about 1,000 people"), vec!["about", "1,000", "people"]);
    }

    #[test]
    fn splits_contractions_and_possessives() {
        assert_eq!(
            tokenize("Don't take John's car"),
            vec!["do", "n't", "take", "john", "'s", "car"]
        );
        assert_eq!(tokenize("they'll go"), vec!["they", "'ll", "go"]);
    }

    #[test]
    fn separates_brackets_and_quotes() {
        assert_eq!(
            tokenize("the \"big\" (red) dog"),
            vec!["the", "``", "big", "''", "(", "red", ")", "dog"]
        );
    }

    #[test]
    fn double_quotes_become_treebank_quote_tokens() {
        assert_eq!(
            tokenize("He said \"yes\" today"),
            vec!["he", "said", "``", "yes", "''", "today"]
        );
        assert_eq!(
            tokenize("\"Yes,\" he said."),
            vec!["``", "yes", ",", "''", "he", "said", "."]
        );
        assert_eq!(tokenize("a (\"b\")"), vec!["a", "(", "``", "b", "''", ")"]);
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert!(tokenize("   ").is_empty());
    }
}
