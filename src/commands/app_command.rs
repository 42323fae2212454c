use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Link {
        farmer_id: String,
        crop_type: String,
    },
    Farmer {
        farmer_id: String,
    },
    Dataset,
    Stats,
    Refresh,
    Import {
        path: String,
    },
    Export {
        path: String,
    },
    Help,
    Quit,
    Unknown(String),
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "link" | "l" => {
                // 作物名可能带空格，例如 "Sweet Potato"
                match (parts.get(1), parts.get(2)) {
                    (Some(farmer), Some(_)) => Ok(AppCommand::Link {
                        farmer_id: farmer.to_string(),
                        crop_type: parts[2..].join(" "),
                    }),
                    _ => Ok(AppCommand::Unknown("用法: link <farmer_id> <crop_type>".to_string())),
                }
            }
            "farmer" | "f" => {
                if let Some(id) = parts.get(1) {
                    Ok(AppCommand::Farmer {
                        farmer_id: id.to_string(),
                    })
                } else {
                    Ok(AppCommand::Unknown("用法: farmer <farmer_id>".to_string()))
                }
            }
            "dataset" => Ok(AppCommand::Dataset),
            "stats" => Ok(AppCommand::Stats),
            "refresh" | "r" => Ok(AppCommand::Refresh),
            "import" => {
                let path = parts[1..].join(" ");
                if !path.is_empty() {
                    Ok(AppCommand::Import { path })
                } else {
                    Ok(AppCommand::Unknown("用法: import <file.json>".to_string()))
                }
            }
            "export" => {
                let path = parts[1..].join(" ");
                if !path.is_empty() {
                    Ok(AppCommand::Export { path })
                } else {
                    Ok(AppCommand::Unknown("用法: export <file.json>".to_string()))
                }
            }
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> AppCommand {
        s.parse().unwrap()
    }

    #[test]
    fn link_keeps_multi_word_crop() {
        assert_eq!(
            parse("link EA10208-HH0012 Sweet Potato"),
            AppCommand::Link {
                farmer_id: "EA10208-HH0012".to_string(),
                crop_type: "Sweet Potato".to_string(),
            }
        );
    }

    #[test]
    fn missing_arguments_yield_usage() {
        assert_eq!(
            parse("link EA10208-HH0012"),
            AppCommand::Unknown("用法: link <farmer_id> <crop_type>".to_string())
        );
        assert_eq!(parse("farmer"), AppCommand::Unknown("用法: farmer <farmer_id>".to_string()));
        assert!(matches!(parse("export"), AppCommand::Unknown(_)));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("dataset"), AppCommand::Dataset);
        assert_eq!(parse("  stats "), AppCommand::Stats);
        assert_eq!(parse("q"), AppCommand::Quit);
        assert_eq!(
            parse("import data/batch 1.json"),
            AppCommand::Import {
                path: "data/batch 1.json".to_string()
            }
        );
        assert_eq!(parse("bogus"), AppCommand::Unknown("未知命令: bogus".to_string()));
    }
}
