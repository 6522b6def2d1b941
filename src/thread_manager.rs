use log::info;
pub type TaskID = i32;

pub trait SteppableTask: Send + 'static {
    /// Runs one unit of work. Returning `false` ends the task.
    fn step(&mut self) -> bool;

    /// Called once on the task's thread after its loop has ended.
    fn on_stop(&mut self) {}
}

/// Cloneable handle observing the manager's stop request.
///
/// Stopping drops the only sender, so every clone sees the channel as
/// disconnected at once.
#[derive(Clone, Debug)]
pub struct StopSignal {
    receiver: crossbeam_channel::Receiver<()>,
}

impl StopSignal {
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(
            self.receiver.try_recv(),
            Ok(()) | Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }

    /// Sleeps for up to `timeout`, returning early with `true` if a stop was
    /// requested.
    #[must_use]
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => true,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => false,
        }
    }
}

pub struct ThreadManager {
    current_task_id: TaskID,
    tasks: std::collections::HashMap<TaskID, std::thread::JoinHandle<()>>,
    stop_sender: Option<crossbeam_channel::Sender<()>>,
    stop_signal: StopSignal,
}

impl ThreadManager {
    #[must_use]
    pub fn new() -> Self {
        let (stop_sender, receiver) = crossbeam_channel::bounded::<()>(0);
        ThreadManager {
            current_task_id: 0,
            tasks: std::collections::HashMap::new(),
            stop_sender: Some(stop_sender),
            stop_signal: StopSignal { receiver },
        }
    }

    /// Handle for work that has to notice a stop request inside a step,
    /// e.g. while waiting to reconnect.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    /// Spawns `task` on its own thread.
    ///
    /// A zero `period` steps the task back to back; otherwise steps are
    /// started `period` apart.
    ///
    /// # Panics
    ///
    /// Will panic if thread does not spawn successfully.
    pub fn add_task<T>(&mut self, task: T, period: std::time::Duration) -> TaskID
    where
        T: SteppableTask,
    {
        let id = self.current_task_id;
        let stop_signal = self.stop_signal.clone();

        let thread_task: Box<dyn FnOnce() + Send> = if period.is_zero() {
            Box::new(move || {
                run_task_continuously(task, &stop_signal);
            })
        } else {
            Box::new(move || {
                run_task_with_period(task, period, &stop_signal);
            })
        };

        let handle = std::thread::Builder::new()
            .name(std::any::type_name::<T>().to_string())
            .spawn(move || {
                thread_task();
            })
            .expect("Failed to spawn thread");
        self.tasks.insert(id, handle);
        self.current_task_id += 1;
        id
    }

    pub fn stop_all_tasks(&mut self) {
        info!("ThreadManager: Signaling all tasks to stop...");
        self.stop_sender.take();
    }

    pub fn wait_on_task_finish(&mut self, task_id: TaskID) {
        if let Some(handle) = self.tasks.remove(&task_id) {
            let _ = handle.join();
        }
    }

    pub fn wait_on_all_tasks(&mut self) {
        let mut task_ids: Vec<TaskID> = self.tasks.keys().copied().collect();
        task_ids.sort_unstable();
        for task_id in task_ids {
            self.wait_on_task_finish(task_id);
        }
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        ThreadManager::new()
    }
}

fn run_task_continuously<T: SteppableTask>(mut task: T, stop_signal: &StopSignal) {
    loop {
        if stop_signal.is_stopped() {
            break;
        }

        if !task.step() {
            break;
        }

        std::thread::yield_now();
    }
    task.on_stop();
}

fn run_task_with_period<T: SteppableTask>(
    mut task: T,
    period: std::time::Duration,
    stop_signal: &StopSignal,
) {
    let mut next_run = std::time::Instant::now();
    loop {
        if !task.step() {
            break;
        }

        next_run += period;
        let now = std::time::Instant::now();

        if next_run > now {
            // Wait for timeout (next loop) OR stop signal
            if stop_signal.wait_timeout(next_run - now) {
                break;
            }
        } else {
            // Reset drift base if we are lagging badly
            log::debug!("Task is running behind its period");
            next_run = now;

            if stop_signal.is_stopped() {
                break;
            }
        }
    }
    task.on_stop();
}
