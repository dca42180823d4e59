use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

static TEXT_DIR: Dir = include_dir!("src/texts");

/// Supplies the reference text for a session. Injected into the session so
/// the state machine stays free of data files and randomness.
pub trait TextSource {
    /// Uniform random choice over the full corpus.
    fn pick_random(&self) -> String;
    /// Uniform random choice over passages of at least `min_len` characters,
    /// falling back to the first passage when none qualifies.
    fn pick_at_least(&self, min_len: usize) -> String;
}

/// A fixed, ship-time collection of practice passages.
#[derive(Deserialize, Clone, Debug)]
pub struct Corpus {
    pub name: String,
    pub passages: Vec<String>,
}

impl Corpus {
    pub fn new(file_name: &str) -> Self {
        read_corpus_from_file(&format!("{file_name}.json")).unwrap()
    }
}

fn read_corpus_from_file(file_name: &str) -> Result<Corpus, Box<dyn Error>> {
    let file = TEXT_DIR.get_file(file_name).expect("Corpus file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret file as a string");

    let corpus = from_str(file_as_str).expect("Unable to deserialize corpus json");

    Ok(corpus)
}

impl TextSource for Corpus {
    fn pick_random(&self) -> String {
        let mut rng = rand::thread_rng();
        self.passages.choose(&mut rng).cloned().unwrap_or_default()
    }

    fn pick_at_least(&self, min_len: usize) -> String {
        let mut rng = rand::thread_rng();
        let qualifying: Vec<&String> = self
            .passages
            .iter()
            .filter(|p| p.chars().count() >= min_len)
            .collect();

        match qualifying.choose(&mut rng) {
            Some(p) => (*p).clone(),
            None => self.passages.first().cloned().unwrap_or_default(),
        }
    }
}
