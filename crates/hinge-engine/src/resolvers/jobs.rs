//! Taking on and completing faction jobs.

use hinge_core::{
    tags, Action, ActionPayload, ActionType, Campaign, EventPayload, JobStatus, ProposalResult,
};

use super::Preview;
use crate::config::EngineConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::{expect_payload, Resolver, ResolverContext};

#[derive(Debug, Default, Clone)]
pub struct AcceptJobResolver;

impl Resolver for AcceptJobResolver {
    fn action_type(&self) -> ActionType {
        ActionType::AcceptJob
    }

    fn description(&self) -> &str {
        "Take on a job offered by a patron faction"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, _config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::AcceptJob { job: job_id } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::AcceptJob,
                found: payload.action_type(),
            });
        };
        let Some(job) = state.jobs.get(job_id) else {
            return Ok(Preview::unknown(ActionType::AcceptJob, "job", job_id));
        };

        let standing = state.standing(&job.patron).unwrap_or_default();
        let mut preview = Preview::new(ActionType::AcceptJob);
        preview
            .require(format!("{} is on offer", job.title), job.status == JobStatus::Offered)
            .require(
                format!("standing with {} at least {:+} (currently {standing})", job.patron, job.min_standing),
                standing >= job.min_standing,
            );
        preview
            .cost_mut()
            .notes
            .push(format!("complete it in {} for {} credits", job.region, job.reward_credits));
        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let job_id = expect_payload!(action, ActionType::AcceptJob, ActionPayload::AcceptJob { job } => job);
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ResolverError::unknown("job", job_id))?;
        if job.status != JobStatus::Offered {
            return Err(ResolverError::inconsistent(format!("job {job_id} is not on offer")));
        }
        job.status = JobStatus::Active;
        let patron = job.patron.clone();

        ctx.emit(
            EventPayload::JobAccepted {
                job: job_id.clone(),
                patron: patron.clone(),
            },
            vec![tags::faction(&patron), format!("job_accepted:{job_id}")],
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CompleteJobResolver;

impl Resolver for CompleteJobResolver {
    fn action_type(&self) -> ActionType {
        ActionType::CompleteJob
    }

    fn description(&self) -> &str {
        "Deliver on an accepted job"
    }

    fn preview(&self, state: &Campaign, payload: &ActionPayload, _config: &EngineConfig) -> ResolverResult<ProposalResult> {
        let ActionPayload::CompleteJob { job: job_id } = payload else {
            return Err(ResolverError::PayloadMismatch {
                expected: ActionType::CompleteJob,
                found: payload.action_type(),
            });
        };
        let Some(job) = state.jobs.get(job_id) else {
            return Ok(Preview::unknown(ActionType::CompleteJob, "job", job_id));
        };

        let mut preview = Preview::new(ActionType::CompleteJob);
        preview
            .require(format!("{} has been accepted", job.title), job.status == JobStatus::Active)
            .require(
                format!("you are in {}", job.region),
                state.player.current_region == job.region,
            );
        let cost = preview.cost_mut();
        cost.credits = -job.reward_credits;
        cost.standing.push((job.patron.clone(), job.standing_reward));
        if let Some(opposed) = &job.opposed_by {
            cost.standing.push((opposed.clone(), -job.standing_reward));
        }
        Ok(preview.build())
    }

    fn resolve(&self, state: &mut Campaign, action: &Action, ctx: &mut ResolverContext<'_>) -> ResolverResult<()> {
        let job_id = expect_payload!(action, ActionType::CompleteJob, ActionPayload::CompleteJob { job } => job);
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ResolverError::unknown("job", job_id))?;
        if job.status != JobStatus::Active {
            return Err(ResolverError::inconsistent(format!("job {job_id} is not active")));
        }
        job.status = JobStatus::Completed;
        let job = job.clone();

        state.player.credits += job.reward_credits;
        ctx.emit(
            EventPayload::ResourcesChanged {
                credits: job.reward_credits,
                social_energy: 0,
                exposure: 0,
            },
            Vec::new(),
        );

        let mut job_tags = vec![tags::job_completed(job_id), tags::faction(&job.patron)];
        job_tags.extend(job.tags.iter().cloned());
        ctx.emit(
            EventPayload::JobCompleted {
                job: job_id.clone(),
                reward_credits: job.reward_credits,
            },
            job_tags,
        );

        let reason = format!("completed {}", job.title);
        ctx.shift_standing(state, &job.patron, job.standing_reward, &reason, Vec::new())?;
        if let Some(opposed) = &job.opposed_by {
            ctx.shift_standing(state, opposed, -job.standing_reward, &reason, Vec::new())?;
        }

        // Work done in a region ties the player into it.
        if let Some(region) = state.regions.get_mut(&job.region) {
            let previous = region.connectivity;
            region.connectivity = previous.raised();
            if region.connectivity != previous {
                ctx.emit(
                    EventPayload::ConnectivityUpdated {
                        region: job.region.clone(),
                        from: previous,
                        to: region.connectivity,
                    },
                    vec![format!("connectivity:{}", job.region)],
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::test_support::{action, two_region_campaign};
    use hinge_core::{FactionId, Job, JobId};

    fn with_job() -> Campaign {
        let mut campaign = two_region_campaign();
        campaign.jobs.insert(
            JobId::new("salvage"),
            Job {
                title: "Salvage run".to_string(),
                patron: FactionId::new("guild"),
                region: "docks".into(),
                status: JobStatus::Offered,
                min_standing: 10,
                reward_credits: 40,
                standing_reward: 6,
                opposed_by: Some(FactionId::new("syndicate")),
                tags: vec!["salvage".to_string()],
            },
        );
        campaign
    }

    #[test]
    fn test_complete_requires_accepting_first() {
        let campaign = with_job();
        let preview = CompleteJobResolver
            .preview(
                &campaign,
                &ActionPayload::CompleteJob { job: JobId::new("salvage") },
                &EngineConfig::default(),
            )
            .unwrap();
        assert!(!preview.traversable);
    }

    #[test]
    fn test_accept_then_complete_pays_and_shifts_standing() {
        let config = EngineConfig::default();
        let mut campaign = with_job();

        let accept = action(&campaign, "j1", ActionPayload::AcceptJob { job: JobId::new("salvage") });
        let mut ctx = ResolverContext::new(&config, &accept.action_id, 1, 1, 0);
        AcceptJobResolver.resolve(&mut campaign, &accept, &mut ctx).unwrap();
        assert_eq!(campaign.jobs[&JobId::new("salvage")].status, JobStatus::Active);

        let complete = action(&campaign, "j2", ActionPayload::CompleteJob { job: JobId::new("salvage") });
        let mut ctx = ResolverContext::new(&config, &complete.action_id, 2, 1, 0);
        CompleteJobResolver.resolve(&mut campaign, &complete, &mut ctx).unwrap();

        assert_eq!(campaign.player.credits, 140);
        assert_eq!(campaign.standing(&FactionId::new("guild")), Some(26));
        assert_eq!(campaign.standing(&FactionId::new("syndicate")), Some(-6));
        assert!(ctx.events().iter().any(|e| e.has_tag("job_completed:salvage")));
    }
}
