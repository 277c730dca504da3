//! qa-client: 질문 상세 화면을 터미널에서 구동하는 헤드리스 호스트

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use qa_lib::config::{load_env_files, ClientConfig};
use qa_lib::error::{ClientError, ErrorPayload, MutationResult};
use qa_lib::models::{VoteDirection, VoteTarget};
use qa_lib::navigation::{BrowserNavigator, Navigator, RecordingNavigator};
use qa_lib::view::{DetailView, QuestionDetailController};
use qa_lib::{init_tracing, ForumApp};

#[derive(Parser, Debug)]
#[command(name = "qa-client", version, about = "Q&A forum client")]
struct Cli {
    /// 로그인 리다이렉트 시 실제로 브라우저를 엶
    #[arg(long, global = true)]
    open_browser: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 현재 세션 사용자 출력
    Whoami,
    /// 질문 상세 화면 출력
    Show {
        question_id: i64,
        /// 렌더 모델을 JSON으로 출력
        #[arg(long)]
        json: bool,
    },
    /// 답변 채택
    Accept { question_id: i64, answer_id: i64 },
    /// 질문/답변 투표
    Vote {
        question_id: i64,
        #[arg(value_enum)]
        target: TargetKind,
        /// 투표 대상 ID (question이면 생략 가능)
        #[arg(long)]
        id: Option<i64>,
        #[arg(value_enum)]
        direction: Direction,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TargetKind {
    Question,
    Answer,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    Up,
    Down,
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env_files();
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    let recorder = Arc::new(RecordingNavigator::new());
    let navigator: Arc<dyn Navigator> = if cli.open_browser {
        Arc::new(BrowserNavigator::new())
    } else {
        recorder.clone()
    };

    let app = match ForumApp::start(config, navigator) {
        Ok(app) => app,
        Err(e) => return report(&e),
    };

    let code = match run(&app, cli.command).await {
        Ok(code) => code,
        Err(e) => report(&e),
    };

    for url in recorder.redirects() {
        println!("redirect -> {}", url);
    }
    app.shutdown().await;
    code
}

fn report(error: &ClientError) -> ExitCode {
    let payload = ErrorPayload::from(error);
    eprintln!("[{}] {}", payload.code, payload.message);
    ExitCode::FAILURE
}

async fn run(app: &ForumApp, command: Command) -> Result<ExitCode, ClientError> {
    match command {
        Command::Whoami => {
            let session = app.sessions().load().await;
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { question_id, json } => {
            let mut controller = app.question_detail()?;
            controller.mount(question_id).await;
            let view = controller.render();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
            Ok(match view {
                DetailView::Loaded(_) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            })
        }
        Command::Accept {
            question_id,
            answer_id,
        } => {
            let mut controller = app.question_detail()?;
            controller.mount(question_id).await;
            let result = controller.accept_answer(answer_id).await;
            Ok(finish_mutation(&mut controller, result).await)
        }
        Command::Vote {
            question_id,
            target,
            id,
            direction,
        } => {
            let target = match target {
                TargetKind::Question => VoteTarget::Question(id.unwrap_or(question_id)),
                TargetKind::Answer => match id {
                    Some(answer_id) => VoteTarget::Answer(answer_id),
                    None => {
                        return Err(ClientError::InvalidOperation(
                            "--id is required when voting on an answer".to_string(),
                        ))
                    }
                },
            };
            let direction = match direction {
                Direction::Up => VoteDirection::Up,
                Direction::Down => VoteDirection::Down,
            };

            let mut controller = app.question_detail()?;
            controller.mount(question_id).await;
            let result = controller.vote(target, direction).await;
            Ok(finish_mutation(&mut controller, result).await)
        }
    }
}

/// 알림을 출력하고, 예약된 리다이렉트가 있으면 끝날 때까지 기다림
async fn finish_mutation(controller: &mut QuestionDetailController, result: MutationResult<()>) -> ExitCode {
    for notice in controller.drain_notices() {
        println!("{}: {}", notice.title, notice.description);
    }
    if let Some(redirect) = controller.take_pending_redirect() {
        let _ = redirect.await;
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn print_view(view: &DetailView) {
    match view {
        DetailView::Loading => println!("Loading..."),
        DetailView::NotFound(not_found) => {
            println!("{}", not_found.title);
            println!("{}", not_found.message);
            println!("[{}] -> {}", not_found.recovery.label, not_found.recovery.route);
        }
        DetailView::Loaded(q) => {
            println!("#{} {}", q.id, q.title);
            if !q.tags.is_empty() {
                println!("tags: {}", q.tags.join(", "));
            }
            println!(
                "{} views · {} answers · {} votes",
                q.stats.views, q.stats.answers, q.stats.votes
            );
            println!("by {} ({}) · {}", q.author.name, q.author.initials, q.author.time_ago);
            println!();
            println!("{}", q.answer_heading);
            for answer in &q.answers {
                let badge = if answer.is_accepted { " [Accepted]" } else { "" };
                println!(
                    "  - #{} {} votes · {} · {}{}",
                    answer.id, answer.votes, answer.author.name, answer.author.time_ago, badge
                );
            }
            if let Some(prompt) = &q.empty_answers {
                println!("  {}", prompt.title);
                println!("  {}", prompt.message);
            }
        }
    }
}
