//! Message command - run a chat-formatted request
//!
//! Replies are printed in fenced chunks sized for chat delivery.

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use orion_core::explain::explain_repository;
use orion_core::git::LocalGit;
use orion_core::request::{chunk_message, ChatRequest, MAX_MESSAGE_LEN};
use orion_core::workflow::Status;
use orion_core::{Config, Error, Secrets};

use super::{build_orchestrator, chat_model, WorkflowFlags};

/// Arguments for the message command
#[derive(Args, Debug)]
pub struct MessageArgs {
    /// Message body with URL:, BRANCH: and TASK: lines, or `-` for stdin
    #[arg(required = true)]
    pub text: String,

    #[command(flatten)]
    pub flags: WorkflowFlags,
}

impl MessageArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<ExitCode> {
        let text = if self.text == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read message from stdin")?;
            buf
        } else {
            self.text.clone()
        };

        let request = match ChatRequest::parse(&text) {
            Ok(request) => request,
            Err(Error::Request(help)) => {
                reply(&help);
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            repo = %request.repo_url,
            branch = %request.branch,
            task = %request.task,
            "Received chat request"
        );

        let workdir = self.flags.workdir(config)?;

        if request.is_explain() {
            let secrets = Secrets::load().context("Failed to load secrets")?;
            let model = chat_model(config, &secrets)?;
            let text = explain_repository(
                &LocalGit,
                model.as_ref(),
                &request.repo_url,
                &workdir,
                Some(request.branch.as_str()),
                self.flags.session_id.as_deref(),
            )
            .await;
            return Ok(match text {
                Ok(text) => {
                    reply(&text);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    reply(&format!("Failed to explain repository: {}", e));
                    ExitCode::FAILURE
                }
            });
        }

        reply(&format!(
            "Processing request for {} on branch {}:\n{}",
            request.repo_url, request.branch, request.task
        ));

        let inputs =
            self.flags
                .inputs(&request.repo_url, &request.branch, &request.task, workdir, config);
        let orchestrator = build_orchestrator(config)?;
        let state = orchestrator.run(inputs, self.flags.session_id.clone()).await;

        reply(&state.summary().to_string());
        Ok(if state.status == Status::Completed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

fn reply(text: &str) {
    for chunk in chunk_message(text, MAX_MESSAGE_LEN) {
        println!("```\n{}\n```", chunk);
    }
}
