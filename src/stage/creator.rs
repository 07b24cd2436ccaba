//! Stage creation: seeding resolution, bracket layout and insertion.
//!
//! Layout is computed in memory first, then persisted in generation order
//! (stage, groups, rounds, matches, games). BYE auto-advance runs as a
//! separate progression pass once the rows exist, so creation and later
//! updates share one propagation path.

use std::collections::HashMap;

use log::debug;

use crate::errors::{Error, Result};
use crate::graph::{self, GraphContext, Location, GROUP_FINAL, GROUP_MAIN, GROUP_SECONDARY};
use crate::model::{
    derive_status, CreateStageInput, GrandFinal, ParticipantId, RoundRobinMode, SeedOrdering, Side,
    Slot, Stage, StageSettings, StageType, Status, TournamentId,
};
use crate::ordering;
use crate::storage::{NewGroup, NewMatch, NewMatchGame, NewParticipant, NewRound, NewStage, Storage};

/// A match computed during layout, identified by position only.
#[derive(Debug, Clone)]
pub(crate) struct GenMatch {
    pub location: Location,
    pub opponent1: Slot,
    pub opponent2: Slot,
}

pub(crate) struct StageCreator<'a> {
    storage: &'a dyn Storage,
}

impl<'a> StageCreator<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        StageCreator { storage }
    }

    pub async fn create(&self, input: CreateStageInput) -> Result<Stage> {
        self.storage
            .select_tournament(input.tournament_id)
            .await?
            .ok_or(Error::not_found("tournament", input.tournament_id))?;
        validate_settings(&input)?;

        let seeding = match &input.seeding {
            Some(names) => {
                Some(resolve_participant_names(self.storage, input.tournament_id, names).await?)
            }
            None => None,
        };
        let number = self.storage.select_stages(input.tournament_id).await?.len() as u32 + 1;

        match input.stage_type {
            StageType::RoundRobin => self.create_round_robin(input, seeding, number).await,
            StageType::SingleElimination | StageType::DoubleElimination => {
                self.create_elimination(input, seeding, number).await
            }
        }
    }

    async fn create_elimination(
        &self,
        input: CreateStageInput,
        seeding: Option<Vec<Option<ParticipantId>>>,
        number: u32,
    ) -> Result<Stage> {
        let mut settings = input.settings.clone();
        let bracket = elimination_bracket_size(&settings, seeding.as_deref())?;
        if input.stage_type == StageType::DoubleElimination && bracket < 4 {
            return Err(Error::InvalidInput(
                "double elimination needs at least 4 bracket slots".into(),
            ));
        }
        settings.size = Some(bracket);
        if settings.seed_ordering.is_none() {
            settings.seed_ordering = Some(SeedOrdering::InnerOuter);
        }

        let ctx = GraphContext {
            stage_type: input.stage_type,
            bracket_size: bracket,
            consolation_final: settings.consolation_final,
            grand_final: settings.grand_final,
            skip_first_round: settings.skip_first_round,
            manual_ordering: settings.manual_ordering.clone(),
        };
        validate_manual_ordering(&ctx)?;

        let field = elimination_field(seeding.as_deref(), bracket, &settings)?;
        let layout = elimination_layout(&ctx, &field);
        self.persist(input.tournament_id, input.name, input.stage_type, number, settings, layout)
            .await
    }

    async fn create_round_robin(
        &self,
        input: CreateStageInput,
        seeding: Option<Vec<Option<ParticipantId>>>,
        number: u32,
    ) -> Result<Stage> {
        let mut settings = input.settings.clone();
        let group_count = settings.group_count.unwrap_or(1);
        let size = round_robin_size(&settings, seeding.as_deref())?;
        if let Some(lists) = &settings.manual_ordering {
            if lists.len() > 1 {
                return Err(Error::InvalidInput(
                    "round robin accepts one manual ordering, for the initial distribution".into(),
                ));
            }
        }
        settings.size = Some(size);
        settings.group_count = Some(group_count);
        if settings.seed_ordering.is_none() {
            settings.seed_ordering = Some(SeedOrdering::GroupsEffortBalanced);
        }

        let field = round_robin_field(seeding.as_deref(), size, &settings, group_count)?;
        let layout = round_robin_layout(&field, group_count, settings.round_robin_mode);
        self.persist(input.tournament_id, input.name, input.stage_type, number, settings, layout)
            .await
    }

    async fn persist(
        &self,
        tournament_id: TournamentId,
        name: String,
        stage_type: StageType,
        number: u32,
        settings: StageSettings,
        layout: Vec<GenMatch>,
    ) -> Result<Stage> {
        let child_count = settings.matches_child_count;
        let stage_id = self
            .storage
            .insert_stage(NewStage {
                tournament_id,
                name: name.clone(),
                stage_type,
                number,
                settings: settings.clone(),
            })
            .await?;

        let mut group_ids = HashMap::new();
        let mut round_ids = HashMap::new();
        for gen in &layout {
            let group = gen.location.group;
            if !group_ids.contains_key(&group) {
                let id = self
                    .storage
                    .insert_group(NewGroup {
                        stage_id,
                        number: group,
                    })
                    .await?;
                group_ids.insert(group, id);
            }
            let round_key = (group, gen.location.round);
            if !round_ids.contains_key(&round_key) {
                let id = self
                    .storage
                    .insert_round(NewRound {
                        stage_id,
                        group_id: group_ids[&group],
                        number: gen.location.round,
                    })
                    .await?;
                round_ids.insert(round_key, id);
            }
        }

        for gen in &layout {
            let status = derive_status(&gen.opponent1, &gen.opponent2);
            let match_id = self
                .storage
                .insert_match(NewMatch {
                    stage_id,
                    group_id: group_ids[&gen.location.group],
                    round_id: round_ids[&(gen.location.group, gen.location.round)],
                    number: gen.location.number,
                    child_count,
                    status,
                    opponent1: gen.opponent1.clone(),
                    opponent2: gen.opponent2.clone(),
                })
                .await?;
            for game_number in 1..=child_count {
                self.storage
                    .insert_match_game(NewMatchGame {
                        parent_id: match_id,
                        number: game_number,
                        status: game_status_for(status),
                        opponent1: game_slot_for(&gen.opponent1),
                        opponent2: game_slot_for(&gen.opponent2),
                    })
                    .await?;
            }
        }

        debug!(
            "created stage {stage_id} ({name}, {stage_type:?}) with {} matches",
            layout.len()
        );
        Ok(Stage {
            id: stage_id,
            tournament_id,
            name,
            stage_type,
            number,
            settings,
        })
    }
}

/// Child-game status mirroring a freshly generated parent.
pub(crate) fn game_status_for(parent: Status) -> Status {
    match parent {
        Status::Locked | Status::Waiting => Status::Locked,
        Status::Ready => Status::Ready,
        Status::Running => Status::Running,
        // A BYE-decided parent will never play its series.
        Status::Completed | Status::Archived => Status::Archived,
    }
}

/// Child-game slot mirroring a parent slot, without inherited outcomes.
pub(crate) fn game_slot_for(parent: &Slot) -> Slot {
    match parent {
        Slot::Bye => Slot::Bye,
        Slot::Position { position } => Slot::Position {
            position: *position,
        },
        Slot::Entry(side) => Slot::entry(side.id),
    }
}

/// Find-or-create the named participants, in seed order.
pub(crate) async fn resolve_participant_names(
    storage: &dyn Storage,
    tournament_id: TournamentId,
    names: &[Option<String>],
) -> Result<Vec<Option<ParticipantId>>> {
    let mut known: HashMap<String, ParticipantId> = storage
        .select_participants(tournament_id)
        .await?
        .into_iter()
        .map(|p| (p.name, p.id))
        .collect();
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match name {
            None => out.push(None),
            Some(name) => {
                if !seen.insert(name.clone()) {
                    return Err(Error::InvalidInput(format!(
                        "participant {name} appears twice in the seeding"
                    )));
                }
                let id = match known.get(name) {
                    Some(&id) => id,
                    None => {
                        let id = storage
                            .insert_participant(NewParticipant {
                                tournament_id,
                                name: name.clone(),
                            })
                            .await?;
                        known.insert(name.clone(), id);
                        id
                    }
                };
                out.push(Some(id));
            }
        }
    }
    Ok(out)
}

fn validate_settings(input: &CreateStageInput) -> Result<()> {
    let s = &input.settings;
    if let Some(size) = s.size {
        if size < 2 {
            return Err(Error::InvalidInput("size must be at least 2".into()));
        }
    }
    if let Some(groups) = s.group_count {
        if groups < 1 {
            return Err(Error::InvalidInput("group count must be at least 1".into()));
        }
    }
    let reject = |message: &str| Err(Error::InvalidInput(message.into()));
    match input.stage_type {
        StageType::RoundRobin => {
            if s.consolation_final {
                return reject("a consolation final applies to single elimination only");
            }
            if s.skip_first_round {
                return reject("skipping the first round applies to double elimination only");
            }
            if s.grand_final != GrandFinal::None {
                return reject("a grand final applies to double elimination only");
            }
            if s.balance_byes {
                return reject("BYE balancing applies to elimination stages only");
            }
        }
        StageType::SingleElimination => {
            if s.grand_final != GrandFinal::None {
                return reject("a grand final applies to double elimination only");
            }
            if s.skip_first_round {
                return reject("skipping the first round applies to double elimination only");
            }
            if s.group_count.is_some() {
                return reject("group count applies to round robin only");
            }
            if s.round_robin_mode == RoundRobinMode::Double {
                return reject("round robin mode applies to round robin only");
            }
        }
        StageType::DoubleElimination => {
            if s.consolation_final {
                return reject("a consolation final applies to single elimination only");
            }
            if s.group_count.is_some() {
                return reject("group count applies to round robin only");
            }
            if s.round_robin_mode == RoundRobinMode::Double {
                return reject("round robin mode applies to round robin only");
            }
        }
    }
    if input.stage_type != StageType::RoundRobin
        && s.matches_child_count > 0
        && s.matches_child_count % 2 == 0
    {
        return reject("an even best-of cannot decide an elimination match");
    }
    Ok(())
}

/// Effective (power of two) bracket size for an elimination stage.
pub(crate) fn elimination_bracket_size(
    settings: &StageSettings,
    seeding: Option<&[Option<ParticipantId>]>,
) -> Result<u32> {
    let seeded = seeding.map(|s| s.len() as u32);
    let base = match (seeded, settings.size) {
        (Some(n), Some(size)) => {
            if size < n {
                return Err(Error::InvalidInput(
                    "size is smaller than the seeded list".into(),
                ));
            }
            size
        }
        (Some(n), None) => n,
        (None, Some(size)) => size,
        (None, None) => {
            return Err(Error::InvalidInput(
                "either a seeding or a size is required".into(),
            ))
        }
    };
    Ok(base.max(2).next_power_of_two())
}

fn round_robin_size(
    settings: &StageSettings,
    seeding: Option<&[Option<ParticipantId>]>,
) -> Result<u32> {
    let seeded = seeding.map(|s| s.len() as u32);
    let size = match (seeded, settings.size) {
        (Some(n), Some(size)) => {
            if size < n {
                return Err(Error::InvalidInput(
                    "size is smaller than the seeded list".into(),
                ));
            }
            size
        }
        (Some(n), None) => n,
        (None, Some(size)) => size,
        (None, None) => {
            return Err(Error::InvalidInput(
                "either a seeding or a size is required".into(),
            ))
        }
    };
    if size < 2 {
        return Err(Error::InvalidInput(
            "round robin needs at least 2 participants".into(),
        ));
    }
    Ok(size)
}

/// Ordered round-1 field of an elimination stage.
///
/// Seed positions attach to the slots before the ordering method permutes
/// them, so the original seeding stays recoverable from the stored matches.
pub(crate) fn elimination_field(
    seeding: Option<&[Option<ParticipantId>]>,
    bracket: u32,
    settings: &StageSettings,
) -> Result<Vec<Slot>> {
    let mut field = base_slots(seeding, bracket);
    if settings.balance_byes && seeding.is_some() {
        field = balance_byes(&field);
    }
    if let Some(perm) = settings
        .manual_ordering
        .as_ref()
        .and_then(|lists| lists.first())
        .filter(|perm| !perm.is_empty())
    {
        validate_permutation(perm, bracket as usize, "first-round manual ordering")?;
        return Ok(perm.iter().map(|&p| field[p as usize - 1].clone()).collect());
    }
    let method = settings.seed_ordering.unwrap_or(SeedOrdering::InnerOuter);
    if ordering::is_group_method(method) {
        return Err(Error::InvalidInput(
            "group ordering methods apply to round robin stages".into(),
        ));
    }
    Ok(ordering::apply(method, &field, 1))
}

/// Distributed field of a round-robin stage, ready to be chunked into groups.
pub(crate) fn round_robin_field(
    seeding: Option<&[Option<ParticipantId>]>,
    size: u32,
    settings: &StageSettings,
    group_count: u32,
) -> Result<Vec<Slot>> {
    let field = base_slots(seeding, size);
    if let Some(perm) = settings
        .manual_ordering
        .as_ref()
        .and_then(|lists| lists.first())
        .filter(|perm| !perm.is_empty())
    {
        validate_permutation(perm, size as usize, "manual group distribution")?;
        return Ok(perm.iter().map(|&p| field[p as usize - 1].clone()).collect());
    }
    let method = settings
        .seed_ordering
        .unwrap_or(SeedOrdering::GroupsEffortBalanced);
    Ok(ordering::apply(method, &field, group_count as usize))
}

fn base_slots(seeding: Option<&[Option<ParticipantId>]>, size: u32) -> Vec<Slot> {
    match seeding {
        Some(ids) => {
            let mut slots: Vec<Slot> = ids
                .iter()
                .enumerate()
                .map(|(index, id)| match id {
                    Some(id) => Slot::Entry(Side::new(*id).at_position(index as u32 + 1)),
                    None => Slot::Bye,
                })
                .collect();
            slots.resize(size as usize, Slot::Bye);
            slots
        }
        None => (1..=size).map(|position| Slot::Position { position }).collect(),
    }
}

/// Interleave BYEs against the top seeds instead of leaving them packed at
/// the end of the field.
fn balance_byes(slots: &[Slot]) -> Vec<Slot> {
    let entries: Vec<Slot> = slots.iter().filter(|s| !s.is_bye()).cloned().collect();
    let mut byes_left = slots.len() - entries.len();
    let mut out = Vec::with_capacity(slots.len());
    let mut rest = entries.into_iter();
    while out.len() < slots.len() {
        match rest.next() {
            Some(entry) => {
                out.push(entry);
                if byes_left > 0 && out.len() < slots.len() {
                    out.push(Slot::Bye);
                    byes_left -= 1;
                }
            }
            None => out.push(Slot::Bye),
        }
    }
    out
}

fn validate_permutation(perm: &[u32], len: usize, what: &str) -> Result<()> {
    let mut sorted: Vec<u32> = perm.to_vec();
    sorted.sort_unstable();
    let expected: Vec<u32> = (1..=len as u32).collect();
    if sorted != expected {
        return Err(Error::InvalidInput(format!(
            "{what} must be a permutation of 1..={len}"
        )));
    }
    Ok(())
}

fn validate_manual_ordering(ctx: &GraphContext) -> Result<()> {
    let Some(lists) = &ctx.manual_ordering else {
        return Ok(());
    };
    let mut expected: Vec<usize> = vec![ctx.bracket_size as usize];
    if ctx.stage_type == StageType::DoubleElimination {
        if !ctx.skip_first_round {
            expected.push((ctx.bracket_size / 2) as usize);
        }
        let mut round = 2;
        while round <= ctx.loser_round_count() {
            expected.push(ctx.loser_round_match_count(round) as usize);
            round += 2;
        }
    }
    if lists.len() > expected.len() {
        return Err(Error::InvalidInput(format!(
            "too many manual orderings: the stage has {} entrant rounds",
            expected.len()
        )));
    }
    for (index, list) in lists.iter().enumerate() {
        if !list.is_empty() {
            validate_permutation(list, expected[index], "manual ordering")?;
        }
    }
    Ok(())
}

/// Placeholder slots referencing a match's feeding positions.
fn placeholder_slots(ctx: &GraphContext, loc: Location) -> (Slot, Slot) {
    let preds = graph::predecessors(ctx, loc);
    match preds.as_slice() {
        [first, second] => (
            Slot::Position {
                position: first.number,
            },
            Slot::Position {
                position: second.number,
            },
        ),
        [only] => (
            Slot::Position {
                position: only.number,
            },
            Slot::Position {
                position: only.number,
            },
        ),
        _ => (Slot::Bye, Slot::Bye),
    }
}

/// Full elimination layout in generation order.
pub(crate) fn elimination_layout(ctx: &GraphContext, field: &[Slot]) -> Vec<GenMatch> {
    let bracket = ctx.bracket_size;
    let main_rounds = ctx.main_round_count();
    let mut out = Vec::new();
    for round in 1..=main_rounds {
        let count = bracket >> round;
        for number in 1..=count {
            let location = Location {
                group: GROUP_MAIN,
                round,
                number,
            };
            let (opponent1, opponent2) = if round == 1 {
                (
                    field[(2 * number - 2) as usize].clone(),
                    field[(2 * number - 1) as usize].clone(),
                )
            } else {
                placeholder_slots(ctx, location)
            };
            out.push(GenMatch {
                location,
                opponent1,
                opponent2,
            });
        }
    }
    match ctx.stage_type {
        StageType::SingleElimination => {
            if ctx.consolation_final && main_rounds >= 2 {
                let location = Location {
                    group: GROUP_SECONDARY,
                    round: 1,
                    number: 1,
                };
                let (opponent1, opponent2) = placeholder_slots(ctx, location);
                out.push(GenMatch {
                    location,
                    opponent1,
                    opponent2,
                });
            }
        }
        StageType::DoubleElimination => {
            for round in 1..=ctx.loser_round_count() {
                let count = ctx.loser_round_match_count(round);
                for number in 1..=count {
                    let location = Location {
                        group: GROUP_SECONDARY,
                        round,
                        number,
                    };
                    let (opponent1, opponent2) = if ctx.skip_first_round && round == 1 {
                        (Slot::Bye, Slot::Bye)
                    } else {
                        placeholder_slots(ctx, location)
                    };
                    out.push(GenMatch {
                        location,
                        opponent1,
                        opponent2,
                    });
                }
            }
            if ctx.grand_final != GrandFinal::None {
                let final_rounds = if ctx.grand_final == GrandFinal::Double {
                    2
                } else {
                    1
                };
                for round in 1..=final_rounds {
                    let location = Location {
                        group: GROUP_FINAL,
                        round,
                        number: 1,
                    };
                    let (opponent1, opponent2) = placeholder_slots(ctx, location);
                    out.push(GenMatch {
                        location,
                        opponent1,
                        opponent2,
                    });
                }
            }
        }
        StageType::RoundRobin => {}
    }
    out
}

/// Split a distributed field into `group_count` groups, as even as possible.
pub(crate) fn chunk_groups(field: &[Slot], group_count: u32) -> Vec<Vec<Slot>> {
    let group_count = group_count.max(1) as usize;
    let base = field.len() / group_count;
    let remainder = field.len() % group_count;
    let mut out = Vec::with_capacity(group_count);
    let mut cursor = 0;
    for index in 0..group_count {
        let size = base + usize::from(index < remainder);
        out.push(field[cursor..cursor + size].to_vec());
        cursor += size;
    }
    out
}

/// Classic circle-method schedule for one group.
///
/// An odd-sized group gets a ghost seat; its pairings are dropped, giving
/// each member one sit-out across the schedule. Double mode appends the
/// mirrored schedule with home and away swapped.
pub(crate) fn circle_rounds(members: &[Slot], mode: RoundRobinMode) -> Vec<Vec<(Slot, Slot)>> {
    let mut seats: Vec<Option<Slot>> = members.iter().cloned().map(Some).collect();
    if seats.len() % 2 == 1 {
        seats.push(None);
    }
    let size = seats.len();
    if size < 2 {
        return Vec::new();
    }
    let mut rounds = Vec::with_capacity(size - 1);
    for turn in 0..size - 1 {
        let mut pairs = Vec::with_capacity(size / 2);
        for seat in 0..size / 2 {
            let home = seats[seat].clone();
            let away = seats[size - 1 - seat].clone();
            if let (Some(home), Some(away)) = (home, away) {
                // The fixed seat alternates sides to balance home and away.
                if seat == 0 && turn % 2 == 1 {
                    pairs.push((away, home));
                } else {
                    pairs.push((home, away));
                }
            }
        }
        rounds.push(pairs);
        seats[1..].rotate_right(1);
    }
    if mode == RoundRobinMode::Double {
        let mirrored: Vec<Vec<(Slot, Slot)>> = rounds
            .iter()
            .map(|round| {
                round
                    .iter()
                    .map(|(home, away)| (away.clone(), home.clone()))
                    .collect()
            })
            .collect();
        rounds.extend(mirrored);
    }
    rounds
}

/// Full round-robin layout in generation order.
pub(crate) fn round_robin_layout(
    field: &[Slot],
    group_count: u32,
    mode: RoundRobinMode,
) -> Vec<GenMatch> {
    let mut out = Vec::new();
    for (group_index, members) in chunk_groups(field, group_count).iter().enumerate() {
        for (round_index, pairs) in circle_rounds(members, mode).iter().enumerate() {
            for (match_index, (home, away)) in pairs.iter().enumerate() {
                out.push(GenMatch {
                    location: Location {
                        group: group_index as u32 + 1,
                        round: round_index as u32 + 1,
                        number: match_index as u32 + 1,
                    },
                    opponent1: home.clone(),
                    opponent2: away.clone(),
                });
            }
        }
    }
    out
}
