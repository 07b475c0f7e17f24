pub struct DefaultsConfig {
    pub scoring_function: String,
    pub matches: usize,
    pub timeout: String,
    pub match_light: bool,
    pub formats: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            scoring_function: "RMSD align".to_string(),
            matches: 1,
            timeout: "5 s".to_string(),
            match_light: true,
            formats: vec!["pdb".to_string()],
        }
    }
}
