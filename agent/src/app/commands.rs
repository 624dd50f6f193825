//! Host commands translated into action tasks

use tracing::{debug, error, info};

use crate::app::state::AppContext;
use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::AgentError;
use crate::models::action::{MowerAction, START_DURATION_RUN_SWITCH, START_DURATION_SELECTOR};
use crate::models::mower::MowerActivity;
use crate::sink::publisher::step_from_cutting_level;
use crate::sink::{DisplayAttrs, UnreachableTarget, WidgetKind, WidgetValue};
use crate::workers::task_queue::TaskKind;

/// A command coming from one of the host widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandInput {
    /// Run switch
    Run(bool),
    /// Cutting height selector level (0, 10, 20, ...)
    CuttingLevel(u32),
    /// Actions selector level (10 to 50)
    ActionSelector(u32),
    Headlight(bool),
}

/// What became of an accepted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Action queued for the worker
    Queued(MowerAction),
    /// Start refused because the mower is charging
    Skipped,
    /// Selector level without an action
    Ignored,
}

/// Handle a host command for a mower
pub async fn handle_command(
    ctx: &AppContext,
    mower_name: &str,
    input: CommandInput,
) -> Result<CommandOutcome, AgentError> {
    debug!(mower = %mower_name, "Command received: {:?}", input);

    if ctx.is_stop_requested() {
        return Err(AgentError::ShutdownError("agent is stopping".to_string()));
    }

    if ctx.token_mngr.current_token().await.is_none() {
        error!("Not logged in to the mower cloud, actions cannot be performed");
        ctx.sink
            .mark_unreachable(UnreachableTarget::Device(mower_name.to_string()));
        return Err(AgentError::AuthError("not logged in".to_string()));
    }

    match ctx.registry.is_off(mower_name) {
        None => {
            error!("Mower {} not found in connected mowers", mower_name);
            ctx.sink
                .mark_unreachable(UnreachableTarget::Device(mower_name.to_string()));
            return Err(AgentError::UnknownDevice(mower_name.to_string()));
        }
        Some(true) => {
            error!("Mower {} is switched off and cannot execute commands", mower_name);
            return Err(AgentError::UnsafeCommand(format!(
                "mower {} is switched off",
                mower_name
            )));
        }
        Some(false) => {}
    }

    match input {
        CommandInput::Run(true) => {
            start_unless_charging(ctx, mower_name, START_DURATION_RUN_SWITCH, true)
        }
        CommandInput::Run(false) => {
            set_run_switch(ctx, mower_name, false);
            queue(ctx, mower_name, MowerAction::ParkUntilFurtherNotice)
        }
        CommandInput::CuttingLevel(level) => {
            let step = step_from_cutting_level(level);
            let steps = ctx.cutting_range.steps.max(1);
            if u32::from(step) > steps {
                error!(
                    "Cutting height level {} is outside the {} configured steps",
                    level, steps
                );
                return Err(AgentError::ValidationError(format!(
                    "cutting height level {} out of range",
                    level
                )));
            }
            queue(ctx, mower_name, MowerAction::SetCuttingHeight(step))
        }
        CommandInput::ActionSelector(level) => match level {
            10 => start_unless_charging(ctx, mower_name, START_DURATION_SELECTOR, false),
            20 => queue(ctx, mower_name, MowerAction::Pause),
            30 => queue(ctx, mower_name, MowerAction::ResumeSchedule),
            40 => queue(ctx, mower_name, MowerAction::ParkUntilFurtherNotice),
            50 => queue(ctx, mower_name, MowerAction::ParkUntilNextSchedule),
            _ => Ok(CommandOutcome::Ignored),
        },
        CommandInput::Headlight(on) => queue(ctx, mower_name, MowerAction::SetHeadlight(on)),
    }
}

fn start_unless_charging(
    ctx: &AppContext,
    mower_name: &str,
    duration_minutes: u32,
    from_run_switch: bool,
) -> Result<CommandOutcome, AgentError> {
    let charging = ctx
        .registry
        .find_by_name(mower_name)
        .ok_or_else(|| AgentError::UnknownDevice(mower_name.to_string()))?
        .activity
        == MowerActivity::Charging;

    if charging {
        info!("Mower {} cannot be started as it is still charging", mower_name);
        ctx.executions.skip(mower_name);
        return Ok(CommandOutcome::Skipped);
    }

    if from_run_switch {
        set_run_switch(ctx, mower_name, true);
    }
    queue(ctx, mower_name, MowerAction::Start { duration_minutes })
}

fn queue(ctx: &AppContext, mower_name: &str, action: MowerAction) -> Result<CommandOutcome, AgentError> {
    ctx.executions.begin(mower_name, action.clone());
    ctx.tasks.enqueue(TaskKind::Action {
        mower_name: mower_name.to_string(),
        action: action.clone(),
    })?;
    Ok(CommandOutcome::Queued(action))
}

fn set_run_switch(ctx: &AppContext, mower_name: &str, on: bool) {
    ctx.sink.upsert_device_widget(
        mower_name,
        WidgetKind::Run,
        WidgetValue::switch(on),
        DisplayAttrs::default(),
    );
}
