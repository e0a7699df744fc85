// Application state and the command/update/render loop

use crate::filter::Filter;
use crate::prompt::Prompt;
use crate::render::{self, View};
use crate::sound::{Played, SoundProvider, SoundState};
use crate::storage::KeyValueStorage;
use crate::store::TaskStore;
use crate::task::{TaskError, TaskId};
use chrono::{DateTime, Utc};
use eyre::Result;
use std::io::Write;
use tracing::{debug, info};

/// A user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Toggle(TaskId),
    Edit(TaskId, String),
    Delete(TaskId),
    ClearAll,
    SetFilter(Filter),
}

/// Side effect requested by [`App::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PlayCompletionSound,
}

pub struct App<S: KeyValueStorage> {
    store: TaskStore<S>,
    filter: Filter,
    sound: SoundProvider,
}

impl<S: KeyValueStorage> App<S> {
    pub fn new(store: TaskStore<S>, sound: SoundProvider) -> Self {
        Self {
            store,
            filter: Filter::default(),
            sound,
        }
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn sound(&self) -> &SoundProvider {
        &self.sound
    }

    /// Resolve the completion sound before anything is shown
    pub async fn start(&mut self) -> View {
        info!("App loading");
        self.resolve_sound().await;
        self.view()
    }

    /// Run the sound resolution if it has not happened yet
    pub async fn resolve_sound(&mut self) -> &SoundState {
        self.sound.resolve().await
    }

    /// Whether `command` will complete a task, and so play the sound
    pub fn needs_sound(&self, command: &Command) -> bool {
        match command {
            Command::Toggle(id) => self.store.get(*id).is_some_and(|t| !t.completed),
            _ => false,
        }
    }

    /// Resolve the sound ahead of a single command, only if it will be played
    pub async fn prepare(&mut self, command: &Command) {
        if self.needs_sound(command) {
            self.resolve_sound().await;
        } else {
            debug!(?command, "Command plays no sound, skipping resolution");
        }
    }

    pub fn view(&self) -> View {
        self.view_at(Utc::now())
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> View {
        render::project(self.store.tasks(), self.filter, now)
    }

    /// Apply one command to the state
    ///
    /// Validation failures are alerted through `prompt` and leave the state
    /// unchanged; only storage failures come back as errors.
    pub fn update(&mut self, command: Command, prompt: &mut dyn Prompt, now: DateTime<Utc>) -> Result<Vec<Effect>> {
        debug!(?command, "update");

        match command {
            Command::Add(text) => {
                alert_on_task_error(self.store.add(&text, now), prompt)?;
            }
            Command::Toggle(id) => {
                if let Some(true) = alert_on_task_error(self.store.toggle_complete(id), prompt)? {
                    return Ok(vec![Effect::PlayCompletionSound]);
                }
            }
            Command::Edit(id, text) => {
                alert_on_task_error(self.store.edit(id, &text), prompt)?;
            }
            Command::Delete(id) => {
                if self.store.get(id).is_none() {
                    prompt.alert(&TaskError::NotFound(id).to_string());
                } else if prompt.confirm("Delete this task?") {
                    self.store.delete(id)?;
                }
            }
            Command::ClearAll => {
                if self.store.is_empty() {
                    prompt.alert(&TaskError::NothingToClear.to_string());
                } else if prompt.confirm("Delete ALL tasks? This cannot be undone!") {
                    self.store.clear_all()?;
                }
            }
            Command::SetFilter(filter) => {
                self.filter = filter;
            }
        }

        Ok(Vec::new())
    }

    /// Execute effects returned by [`App::update`]
    pub fn run_effects(&self, effects: &[Effect]) -> Vec<Played> {
        effects
            .iter()
            .map(|effect| match effect {
                Effect::PlayCompletionSound => self.sound.play(),
            })
            .collect()
    }

    /// Update, write the fresh view to `out`, then run effects
    pub fn dispatch<W: Write>(&mut self, command: Command, prompt: &mut dyn Prompt, out: &mut W) -> Result<Vec<Played>> {
        let effects = self.update(command, prompt, Utc::now())?;

        write!(out, "{}", self.view().to_text())?;
        out.flush()?;

        Ok(self.run_effects(&effects))
    }
}

/// Turn a [`TaskError`] into an alert; other errors propagate
fn alert_on_task_error<T>(result: Result<T>, prompt: &mut dyn Prompt) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match e.downcast_ref::<TaskError>() {
            Some(task_error) => {
                prompt.alert(&task_error.to_string());
                Ok(None)
            }
            None => Err(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::testing::ScriptedPrompt;
    use crate::render::Body;
    use crate::sound::output::testing::RecordingOutput;
    use crate::sound::{AudioOutput, Clip, CommandOutput, PlaybackError, SoundSearch};
    use crate::storage::MemoryStorage;
    use crate::store::TASKS_KEY;
    use crate::task::Task;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    fn app() -> App<MemoryStorage> {
        App::new(TaskStore::load(MemoryStorage::new()).unwrap(), SoundProvider::disabled())
    }

    /// Search that can never succeed; nothing listens on port 1
    fn unreachable_search() -> SoundSearch {
        SoundSearch::new(&crate::config::SoundConfig {
            api_base: "http://127.0.0.1:1/".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        })
    }

    fn unreachable_sound(output: &RecordingOutput) -> SoundProvider {
        SoundProvider::new(unreachable_search(), Box::new(output.clone()))
    }

    /// Terminal stand-in shared between the app and an output
    #[derive(Clone, Default)]
    struct Screen(Rc<RefCell<Vec<u8>>>);

    impl Write for Screen {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Snapshots the screen each time a clip is played
    struct ScreenWatcher {
        screen: Screen,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl AudioOutput for ScreenWatcher {
        fn play(&self, _clip: &Clip) -> Result<(), PlaybackError> {
            let shown = String::from_utf8_lossy(&self.screen.0.borrow()).into_owned();
            self.seen.borrow_mut().push(shown);
            Ok(())
        }
    }

    fn stored(app: &App<MemoryStorage>) -> Vec<Task> {
        match app.store().storage().get_item(TASKS_KEY).unwrap() {
            Some(blob) => serde_json::from_str(&blob).unwrap(),
            None => Vec::new(),
        }
    }

    fn add(app: &mut App<MemoryStorage>, text: &str) -> TaskId {
        let mut prompt = ScriptedPrompt::default();
        app.update(Command::Add(text.to_string()), &mut prompt, Utc::now()).unwrap();
        app.store().tasks().last().unwrap().id
    }

    #[test]
    fn test_add_appends_incomplete_task() {
        let mut app = app();
        add(&mut app, "first");
        let before = stored(&app).len();

        add(&mut app, " second ");

        let tasks = stored(&app);
        assert_eq!(tasks.len(), before + 1);
        assert_eq!(tasks[1].text, "second");
        assert!(!tasks[1].completed);
    }

    #[test]
    fn test_blank_add_alerts() {
        let mut app = app();
        add(&mut app, "first");

        let mut prompt = ScriptedPrompt::default();
        let effects = app.update(Command::Add("   ".to_string()), &mut prompt, Utc::now()).unwrap();

        assert!(effects.is_empty());
        assert_eq!(prompt.alerts, vec!["Please enter a task!".to_string()]);
        assert_eq!(stored(&app).len(), 1);
    }

    #[test]
    fn test_toggle_plays_only_when_completing() {
        let mut app = app();
        let id = add(&mut app, "task");
        let mut prompt = ScriptedPrompt::default();

        let effects = app.update(Command::Toggle(id), &mut prompt, Utc::now()).unwrap();
        assert_eq!(effects, vec![Effect::PlayCompletionSound]);
        assert!(stored(&app)[0].completed);

        let effects = app.update(Command::Toggle(id), &mut prompt, Utc::now()).unwrap();
        assert!(effects.is_empty());
        assert!(!stored(&app)[0].completed);
    }

    #[test]
    fn test_toggle_unknown_alerts() {
        let mut app = app();
        let mut prompt = ScriptedPrompt::default();
        let effects = app.update(Command::Toggle(42), &mut prompt, Utc::now()).unwrap();
        assert!(effects.is_empty());
        assert_eq!(prompt.alerts, vec!["No task with id 42".to_string()]);
    }

    #[test]
    fn test_edit_blank_is_silent() {
        let mut app = app();
        let id = add(&mut app, "original");
        let mut prompt = ScriptedPrompt::default();

        app.update(Command::Edit(id, "  ".to_string()), &mut prompt, Utc::now()).unwrap();
        assert!(prompt.alerts.is_empty());
        assert_eq!(stored(&app)[0].text, "original");

        app.update(Command::Edit(id, "changed".to_string()), &mut prompt, Utc::now()).unwrap();
        assert_eq!(stored(&app)[0].text, "changed");
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = app();
        let a = add(&mut app, "a");
        let b = add(&mut app, "b");
        let c = add(&mut app, "c");

        let mut prompt = ScriptedPrompt::confirming(&[false, true]);
        app.update(Command::Delete(b), &mut prompt, Utc::now()).unwrap();
        assert_eq!(stored(&app).len(), 3);

        app.update(Command::Delete(b), &mut prompt, Utc::now()).unwrap();
        let ids: Vec<TaskId> = stored(&app).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(prompt.questions, vec!["Delete this task?", "Delete this task?"]);
    }

    #[test]
    fn test_clear_all() {
        let mut app = app();
        let mut prompt = ScriptedPrompt::confirming(&[false, true]);

        app.update(Command::ClearAll, &mut prompt, Utc::now()).unwrap();
        assert_eq!(prompt.alerts, vec!["No tasks to clear!".to_string()]);
        assert!(prompt.questions.is_empty());

        add(&mut app, "a");
        add(&mut app, "b");
        app.update(Command::ClearAll, &mut prompt, Utc::now()).unwrap();
        assert_eq!(stored(&app).len(), 2);

        app.update(Command::ClearAll, &mut prompt, Utc::now()).unwrap();
        assert!(stored(&app).is_empty());
        assert_eq!(prompt.questions[0], "Delete ALL tasks? This cannot be undone!");
    }

    #[test]
    fn test_set_filter_changes_view_only() {
        let mut app = app();
        add(&mut app, "open");
        let done = add(&mut app, "done");
        let mut prompt = ScriptedPrompt::default();
        app.update(Command::Toggle(done), &mut prompt, Utc::now()).unwrap();
        let before = stored(&app);

        app.update(Command::SetFilter(Filter::Completed), &mut prompt, Utc::now()).unwrap();
        assert_eq!(app.filter(), Filter::Completed);
        let ids: Vec<TaskId> = app.view().rows().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![done]);
        assert_eq!(stored(&app), before);

        app.update(Command::SetFilter(Filter::Active), &mut prompt, Utc::now()).unwrap();
        app.update(Command::Toggle(done), &mut prompt, Utc::now()).unwrap();
        assert_eq!(app.view().rows().len(), 2);
    }

    #[tokio::test]
    async fn test_completion_with_failed_fetch_plays_tone() {
        let output = RecordingOutput::default();
        let mut app = App::new(TaskStore::load(MemoryStorage::new()).unwrap(), unreachable_sound(&output));

        let view = app.start().await;
        assert_eq!(view.body, Body::Placeholder("No tasks here. Add something meaningful."));
        assert_eq!(app.sound().state(), &SoundState::Resolved(None));

        let id = add(&mut app, "finish");
        let mut prompt = ScriptedPrompt::default();
        let mut out = Vec::new();
        let played = app.dispatch(Command::Toggle(id), &mut prompt, &mut out).unwrap();
        assert_eq!(played, vec![Played::Tone]);
        assert!(app.view().rows()[0].completed);

        let played = output.played();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].extension, "wav");

        let played = app.dispatch(Command::Toggle(id), &mut prompt, &mut out).unwrap();
        assert!(played.is_empty());
        assert_eq!(output.played().len(), 1);
    }

    #[test]
    fn test_view_is_written_before_sound_plays() {
        colored::control::set_override(false);

        let screen = Screen::default();
        let output = ScreenWatcher {
            screen: screen.clone(),
            seen: Rc::default(),
        };
        let seen = output.seen.clone();
        let mut app = App::new(
            TaskStore::load(MemoryStorage::new()).unwrap(),
            SoundProvider::new(unreachable_search(), Box::new(output)),
        );
        let id = add(&mut app, "water the plants");

        let mut prompt = ScriptedPrompt::default();
        let mut out = screen.clone();
        app.dispatch(Command::Toggle(id), &mut prompt, &mut out).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("water the plants"));
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_player_does_not_hold_up_dispatch() {
        let player = CommandOutput::new("sh", vec!["-c".to_string(), "sleep 2".to_string(), "player".to_string()]);
        let mut app = App::new(
            TaskStore::load(MemoryStorage::new()).unwrap(),
            SoundProvider::new(unreachable_search(), Box::new(player)),
        );
        let id = add(&mut app, "finish");

        let mut prompt = ScriptedPrompt::default();
        let started = Instant::now();
        let played = app.dispatch(Command::Toggle(id), &mut prompt, &mut Vec::new()).unwrap();
        assert_eq!(played, vec![Played::Tone]);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_run_effects_reports_playback() {
        let app = app();
        assert_eq!(app.run_effects(&[Effect::PlayCompletionSound]), vec![Played::Silent]);
        assert!(app.run_effects(&[]).is_empty());

        let output = RecordingOutput::default();
        let app = App::new(TaskStore::load(MemoryStorage::new()).unwrap(), unreachable_sound(&output));
        assert_eq!(app.run_effects(&[Effect::PlayCompletionSound]), vec![Played::Tone]);
    }

    #[test]
    fn test_needs_sound_only_for_completing_toggle() {
        let mut app = app();
        let open = add(&mut app, "open");
        let done = add(&mut app, "done");
        let mut prompt = ScriptedPrompt::default();
        app.update(Command::Toggle(done), &mut prompt, Utc::now()).unwrap();

        assert!(app.needs_sound(&Command::Toggle(open)));
        assert!(!app.needs_sound(&Command::Toggle(done)));
        assert!(!app.needs_sound(&Command::Toggle(99)));
        assert!(!app.needs_sound(&Command::Add("x".to_string())));
        assert!(!app.needs_sound(&Command::Delete(open)));
        assert!(!app.needs_sound(&Command::ClearAll));
    }

    #[tokio::test]
    async fn test_prepare_resolves_only_for_completing_toggle() {
        let output = RecordingOutput::default();
        let mut app = App::new(TaskStore::load(MemoryStorage::new()).unwrap(), unreachable_sound(&output));
        let id = add(&mut app, "task");
        let mut prompt = ScriptedPrompt::default();
        app.update(Command::Toggle(id), &mut prompt, Utc::now()).unwrap();

        app.prepare(&Command::Add("more".to_string())).await;
        app.prepare(&Command::Toggle(id)).await;
        app.prepare(&Command::Toggle(99)).await;
        app.prepare(&Command::SetFilter(Filter::Active)).await;
        assert_eq!(app.sound().state(), &SoundState::Unresolved);

        app.update(Command::Toggle(id), &mut prompt, Utc::now()).unwrap();
        app.prepare(&Command::Toggle(id)).await;
        assert_eq!(app.sound().state(), &SoundState::Resolved(None));
    }
}
