// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use clap::{Parser as ClapParser, Subcommand};
use console::style;
use modlink_cli::{
    EntryError, Instance, InstanceConfig, exit_with_parse_errors, print_error, print_graph,
};
use modlink_vm::ecmascript::{
    builtins::Module,
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::AbstractModule, get_module_namespace,
        source_text_module_records::SourceTextModule,
    },
};

/// Loads, links and evaluates ECMAScript module graphs
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "modlink")]
#[command(about = "Loads, links and evaluates ECMAScript module graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Loads and links a module graph and prints it
    Graph {
        #[arg(short, long)]
        verbose: bool,

        /// Answer module loads from the event loop instead of synchronously
        #[arg(short, long)]
        defer_loading: bool,

        /// The path of the entry module
        path: String,
    },

    /// Evaluates module graphs
    Eval {
        #[arg(short, long)]
        verbose: bool,

        /// Answer module loads from the event loop instead of synchronously
        #[arg(short, long)]
        defer_loading: bool,

        /// The entry modules to evaluate
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn load_entry(instance: &mut Instance, path: &str) -> Result<SourceTextModule, EntryError> {
    match instance.load_entry(Path::new(path)) {
        Err(EntryError::Parse {
            path,
            source_text,
            errors,
        }) => exit_with_parse_errors(errors, &path.to_string_lossy(), &source_text),
        result => result,
    }
}

fn print_namespace(instance: &mut Instance, module: SourceTextModule) {
    let agent = instance.agent_mut();
    let namespace: Module = get_module_namespace(agent, module.into());
    match namespace.entries(agent) {
        Ok(entries) => {
            for (name, value) in entries {
                println!("  {} = {}", style(name).bold(), value.string_repr(agent));
            }
        }
        Err(error) => print_error(agent, &error),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    match args.command {
        Command::Graph {
            verbose,
            defer_loading,
            path,
        } => {
            let mut instance = Instance::new(InstanceConfig {
                verbose,
                defer_loading,
            });
            let module = load_entry(&mut instance, &path)?;
            let result = instance
                .load_graph(module)
                .and_then(|()| instance.link(module).map(|_| ()));
            print_graph(instance.agent(), AbstractModule::from(module));
            if let Err(error) = result {
                print_error(instance.agent(), &error);
                std::process::exit(1);
            }
        }
        Command::Eval {
            verbose,
            defer_loading,
            paths,
        } => {
            let mut instance = Instance::new(InstanceConfig {
                verbose,
                defer_loading,
            });
            assert!(!paths.is_empty());
            for path in paths {
                let module = load_entry(&mut instance, &path)?;
                let result = instance.run_module(module);
                for evaluated in instance.take_evaluation_log() {
                    println!("{} {}", style("evaluated").green(), evaluated.display());
                }
                match result {
                    Ok(()) => {
                        if verbose {
                            print_namespace(&mut instance, module);
                        }
                    }
                    Err(error) => {
                        print_error(instance.agent(), &error);
                        std::process::exit(1);
                    }
                }
            }
        }
    }
    Ok(())
}
