use crate::cli_args::PromptsArgs;
use crate::output::{print_json, print_prompt_list};
use anyhow::Result;
use colored::*;
use llmctx_core::{PromptKey, PromptTemplate};
use serde::Serialize;

#[derive(Serialize)]
struct PromptEntry<'a> {
    key: PromptKey,
    #[serde(flatten)]
    template: &'a PromptTemplate,
}

pub fn handle_prompts_command(args: &PromptsArgs) -> Result<()> {
    let as_json = args.format.as_deref() == Some("json");
    match args.key.as_deref() {
        None => {
            let entries: Vec<PromptEntry> = PromptKey::ALL
                .into_iter()
                .map(|key| PromptEntry {
                    key,
                    template: key.template(),
                })
                .collect();
            if as_json {
                print_json(&entries)
            } else {
                print_prompt_list(PromptKey::ALL.iter().map(|k| (*k, k.template())));
                Ok(())
            }
        }
        Some(raw) => {
            let key: PromptKey = raw.parse()?;
            let template = key.template();
            if as_json {
                print_json(&PromptEntry { key, template })
            } else {
                println!("{} {}", "#".dimmed(), template.title.bold());
                println!("{}\n", template.description.dimmed());
                println!("{}", template.instructions.trim_end());
                println!("\n{}", template.closing.trim());
                Ok(())
            }
        }
    }
}
