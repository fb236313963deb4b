use std::io::{self, Stdout, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use log::{debug, error, info};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::app::{App, Effect, EffectRunner};
use crate::clockify::ClockifyRepository;
use crate::messages::Message;

/// 入力イベントを待つ間隔。
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// rawモードと代替スクリーンを有効にし、dropで元に戻す。
struct Screen {
    stdout: Stdout,
}

impl Screen {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide).context("Failed to enter alternate screen")?;

        // パニック時も端末を元に戻す
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
            original_hook(panic_info);
        }));

        Ok(Self { stdout })
    }

    fn draw(&mut self, lines: &[String]) -> Result<()> {
        queue!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        for line in lines {
            // rawモードでは改行だけでは行頭に戻らない
            queue!(self.stdout, Print(line), Print("\r\n"))?;
        }
        self.stdout.flush().context("Failed to draw screen")
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.stdout, LeaveAlternateScreen, Show);
    }
}

/// 端末の入力を読み取り、メッセージとして送信する。
///
/// 受信側が閉じられると終了する。
fn spawn_input(sender: UnboundedSender<Message>) {
    tokio::task::spawn_blocking(move || {
        while !sender.is_closed() {
            let message = match event::poll(POLL_INTERVAL).and_then(|ready| {
                if ready {
                    event::read().map(Some)
                } else {
                    Ok(None)
                }
            }) {
                Ok(Some(Event::Key(key))) if key.kind == KeyEventKind::Press => Message::Key(key),
                Ok(Some(Event::Resize(width, height))) => Message::Resize(width, height),
                Ok(_) => continue,
                Err(err) => {
                    error!("Failed to read terminal event: {}", err);
                    break;
                }
            };
            if sender.send(message).is_err() {
                break;
            }
        }
        debug!("Input reader stopped");
    });
}

/// イベントループを実行する。`Effect::Quit`を受け取ると終了する。
///
/// `Effect`は別タスクで実行し、結果のメッセージを同じチャネルで受け取る。
///
/// # Arguments
///
/// * `app` - 画面の状態
/// * `runner` - `Effect`を実行する
pub async fn run<R: ClockifyRepository + 'static>(
    mut app: App,
    runner: EffectRunner<R>,
) -> Result<()> {
    let mut screen = Screen::enter()?;
    let (sender, mut receiver) = mpsc::unbounded_channel();
    spawn_input(sender.clone());

    let mut effects = app.init();
    loop {
        for effect in effects.drain(..) {
            if effect == Effect::Quit {
                info!("Quit");
                return Ok(());
            }
            let runner = runner.clone();
            let sender = sender.clone();
            tokio::spawn(async move {
                if let Some(message) = runner.run(effect).await {
                    let _ = sender.send(message);
                }
            });
        }

        screen.draw(&app.view())?;

        let Some(message) = receiver.recv().await else {
            break;
        };
        effects = app.update(message);
    }

    Ok(())
}
