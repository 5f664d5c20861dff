use engine_logging::{engine_debug, engine_warn};

use crate::{Effect, HarvestFailure, HarvestState, Msg, ParsePolicy, Phase, StopReason};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages about a page other than the one in flight, and anything arriving
/// after the harvest reached a terminal phase, are ignored.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            if state.phase() == Phase::Idle {
                let url = state.begin_fetch();
                vec![Effect::FetchPage {
                    page: state.cursor().page(),
                    url,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::PageFetched { page } => {
            if state.phase() == (Phase::Fetching { page }) {
                state.set_phase(Phase::Parsing { page });
            }
            Vec::new()
        }
        Msg::LinksExtracted { page, hrefs } => {
            if !is_in_flight(&state, page) {
                return (state, Vec::new());
            }
            let candidates = hrefs.len();
            let fresh = state.absorb(hrefs);
            engine_debug!(
                "page {} yielded {} candidates, {} new, {} total",
                page,
                candidates,
                fresh,
                state.links().len()
            );
            if fresh == 0 {
                if let Some(effects) = refetch_at_fallback(&mut state) {
                    return (state, effects);
                }
            }
            settle(&mut state, page, fresh > 0)
        }
        Msg::PageNotFound { page } => {
            if !is_in_flight(&state, page) {
                return (state, Vec::new());
            }
            if page <= 1 {
                abort(
                    &mut state,
                    page,
                    HarvestFailure::Fetch {
                        reason: "first listing page not found".to_string(),
                    },
                )
            } else if let Some(effects) = refetch_at_fallback(&mut state) {
                effects
            } else {
                finish(&mut state, StopReason::PageNotFound { page })
            }
        }
        Msg::PageMalformed { page, reason } => {
            if !is_in_flight(&state, page) {
                return (state, Vec::new());
            }
            match state.settings().parse_policy {
                ParsePolicy::Skip => match refetch_at_fallback(&mut state) {
                    Some(effects) => effects,
                    None => {
                        engine_warn!("skipping malformed page {}: {}", page, reason);
                        settle(&mut state, page, false)
                    }
                },
                ParsePolicy::Abort => abort(&mut state, page, HarvestFailure::Parse { reason }),
            }
        }
        Msg::FetchFailed { page, reason } => {
            if !is_in_flight(&state, page) {
                return (state, Vec::new());
            }
            abort(&mut state, page, HarvestFailure::Fetch { reason })
        }
    };

    (state, effects)
}

fn is_in_flight(state: &HarvestState, page: u32) -> bool {
    match state.phase() {
        Phase::Fetching { page: current } | Phase::Parsing { page: current } => current == page,
        _ => false,
    }
}

fn refetch_at_fallback(state: &mut HarvestState) -> Option<Vec<Effect>> {
    let url = state.begin_fallback_fetch()?;
    let page = state.cursor().page();
    engine_debug!("page {} gave nothing, retrying at {}", page, url);
    Some(vec![Effect::FetchPage { page, url }])
}

fn settle(state: &mut HarvestState, page: u32, produced_links: bool) -> Vec<Effect> {
    state.settle_page(produced_links);
    if state.empty_streak() >= state.settings().max_empty_pages.max(1) {
        finish(state, StopReason::NoNewLinks { page })
    } else {
        next_page(state)
    }
}

fn next_page(state: &mut HarvestState) -> Vec<Effect> {
    let max_pages = state.settings().max_pages;
    if state.cursor().page() >= max_pages {
        return finish(state, StopReason::PageLimit { max_pages });
    }
    state.advance_cursor();
    let url = state.begin_fetch();
    vec![Effect::FetchPage {
        page: state.cursor().page(),
        url,
    }]
}

fn finish(state: &mut HarvestState, reason: StopReason) -> Vec<Effect> {
    state.set_phase(Phase::Complete(reason));
    vec![Effect::Finish { reason }]
}

fn abort(state: &mut HarvestState, page: u32, error: HarvestFailure) -> Vec<Effect> {
    state.fail(error.clone());
    vec![Effect::Abort { page, error }]
}
