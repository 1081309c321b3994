//! Points and medal standings.
//!
//! Standings are never stored. Every call recomputes them from the full set of
//! events, participants, teams and departments, so the result depends only on
//! that data and not on the order it is handed over in.
//!
//! Crediting rules:
//! - an individual placement credits the participant and their department;
//! - a team placement credits the team's department once, and every member of
//!   the team individually with the full points and medal.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use super::timed;
use crate::dto::standings::{
    Achievement, DepartmentStats, LeaderboardResponse, MedalTally, ParticipantStats, Standings,
};
use crate::error::{MeetError, Result};
use crate::models::{Department, Event, Medal, Participant, Rank, RosterEntry, Team};
use crate::repository::Store;

/// One settled placement found while walking the rounds.
struct Placement<'a> {
    event: &'a Event,
    round_name: &'a str,
    entry: RosterEntry,
    rank: Rank,
}

impl Placement<'_> {
    fn points(&self) -> i64 {
        i64::from(self.event.points.points_for(self.rank, self.event.discipline))
    }

    fn medal(&self) -> Medal {
        self.rank.medal()
    }
}

/// Every ranked row of every round, in event then round order.
fn placements(events: &[Event]) -> impl Iterator<Item = Placement<'_>> {
    events.iter().flat_map(|event| {
        event.rounds().iter().flat_map(move |round| {
            round.participants.iter().filter_map(move |row| {
                row.rank.map(|rank| Placement {
                    event,
                    round_name: round.name.as_str(),
                    entry: row.entry,
                    rank,
                })
            })
        })
    })
}

pub fn compute_standings(
    events: &[Event],
    participants: &[Participant],
    teams: &[Team],
    departments: &[Department],
) -> Standings {
    let mut people: BTreeMap<Uuid, ParticipantStats> = participants
        .iter()
        .map(|p| {
            (
                p.participant_id,
                ParticipantStats {
                    participant_id: p.participant_id,
                    name: p.name.clone(),
                    chest_number: p.chest_number,
                    department_id: p.department_id,
                    gender: p.gender,
                    points: 0,
                    medals: MedalTally::default(),
                },
            )
        })
        .collect();

    let mut depts: BTreeMap<Uuid, DepartmentStats> = departments
        .iter()
        .map(|d| {
            (
                d.department_id,
                DepartmentStats {
                    department_id: d.department_id,
                    name: d.name.clone(),
                    code: d.code.clone(),
                    points: 0,
                    medals: MedalTally::default(),
                },
            )
        })
        .collect();

    let teams_by_id: HashMap<Uuid, &Team> = teams.iter().map(|t| (t.team_id, t)).collect();

    for placement in placements(events) {
        let points = placement.points();
        let medal = placement.medal();

        match placement.entry {
            RosterEntry::Individual(participant_id) => {
                let Some(stats) = people.get_mut(&participant_id) else {
                    warn!(
                        participant_id = %participant_id,
                        event = %placement.event.name,
                        "Skipping placement of unknown participant"
                    );
                    continue;
                };
                stats.points += points;
                stats.medals.add(medal);
                let department_id = stats.department_id;
                credit_department(&mut depts, department_id, points, medal);
            }
            RosterEntry::Team(team_id) => {
                let Some(team) = teams_by_id.get(&team_id) else {
                    warn!(
                        team_id = %team_id,
                        event = %placement.event.name,
                        "Skipping placement of unknown team"
                    );
                    continue;
                };
                credit_department(&mut depts, team.department_id, points, medal);
                for member in &team.members {
                    match people.get_mut(member) {
                        Some(stats) => {
                            stats.points += points;
                            stats.medals.add(medal);
                        }
                        None => warn!(
                            participant_id = %member,
                            team = %team.name,
                            "Skipping unknown team member"
                        ),
                    }
                }
            }
        }
    }

    let mut participants: Vec<ParticipantStats> = people.into_values().collect();
    participants.sort_by(|a, b| {
        standing_order(a.points, &a.medals, b.points, &b.medals)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });

    let mut departments: Vec<DepartmentStats> = depts.into_values().collect();
    departments.sort_by(|a, b| {
        standing_order(a.points, &a.medals, b.points, &b.medals)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.department_id.cmp(&b.department_id))
    });

    Standings {
        participants,
        departments,
    }
}

fn credit_department(
    depts: &mut BTreeMap<Uuid, DepartmentStats>,
    department_id: Uuid,
    points: i64,
    medal: Medal,
) {
    match depts.get_mut(&department_id) {
        Some(stats) => {
            stats.points += points;
            stats.medals.add(medal);
        }
        None => warn!(department_id = %department_id, "Skipping credit to unknown department"),
    }
}

/// Points first, then gold, silver and bronze counts; all descending.
fn standing_order(a_points: i64, a: &MedalTally, b_points: i64, b: &MedalTally) -> Ordering {
    b_points
        .cmp(&a_points)
        .then_with(|| b.gold.cmp(&a.gold))
        .then_with(|| b.silver.cmp(&a.silver))
        .then_with(|| b.bronze.cmp(&a.bronze))
}

/// Every credit `participant_id` receives, directly or through a team.
pub fn achievements_for(participant_id: Uuid, events: &[Event], teams: &[Team]) -> Vec<Achievement> {
    let teams_by_id: HashMap<Uuid, &Team> = teams.iter().map(|t| (t.team_id, t)).collect();

    placements(events)
        .filter_map(|placement| {
            let team_id = match placement.entry {
                RosterEntry::Individual(id) if id == participant_id => None,
                RosterEntry::Team(id)
                    if teams_by_id
                        .get(&id)
                        .is_some_and(|team| team.members.contains(&participant_id)) =>
                {
                    Some(id)
                }
                _ => return None,
            };

            Some(Achievement {
                event_id: placement.event.event_id,
                event_name: placement.event.name.clone(),
                round_name: placement.round_name.to_string(),
                rank: placement.rank,
                medal: placement.medal(),
                points: placement.points(),
                team_id,
            })
        })
        .collect()
}

/// Loads the whole dataset and runs the pure computations above.
#[derive(Clone)]
pub struct ScoringService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl ScoringService {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn standings(&self) -> Result<Standings> {
        let events = timed(self.timeout, self.store.list_events()).await?;
        let participants = timed(self.timeout, self.store.list_participants()).await?;
        let teams = timed(self.timeout, self.store.list_teams()).await?;
        let departments = timed(self.timeout, self.store.list_departments()).await?;

        Ok(compute_standings(&events, &participants, &teams, &departments))
    }

    pub async fn leaderboard(&self) -> Result<LeaderboardResponse> {
        Ok(self.standings().await?.into())
    }

    pub async fn participant_stats(&self, participant_id: Uuid) -> Result<ParticipantStats> {
        self.standings()
            .await?
            .participant(participant_id)
            .cloned()
            .ok_or_else(|| MeetError::NotFound(format!("Participant {}", participant_id)))
    }

    pub async fn achievements(&self, participant_id: Uuid) -> Result<Vec<Achievement>> {
        timed(self.timeout, self.store.get_participant(participant_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Participant {}", participant_id)))?;

        let events = timed(self.timeout, self.store.list_events()).await?;
        let teams = timed(self.timeout, self.store.list_teams()).await?;
        Ok(achievements_for(participant_id, &events, &teams))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;
    use crate::models::{
        ChestNumber, Discipline, Gender, GenderCategory, HeatEntry, NewEvent, PointSchedule,
    };

    fn department(code: &str) -> Department {
        Department {
            department_id: Uuid::new_v4(),
            name: format!("Department {}", code),
            code: code.to_string(),
        }
    }

    fn participant(n: i32, gender: Gender, department: &Department) -> Participant {
        Participant {
            participant_id: Uuid::new_v4(),
            name: format!("Athlete {:02}", n),
            registration_code: format!("REG{}", n),
            department_id: department.department_id,
            cohort: None,
            semester: None,
            gender,
            chest_number: ChestNumber(100 + n),
            created_at: Utc::now().naive_utc(),
        }
    }

    /// An event whose only round is the final, ranked as given.
    fn ranked_event(
        discipline: Discipline,
        points: PointSchedule,
        podium: &[(RosterEntry, Rank)],
    ) -> Event {
        let mut event = Event::new(NewEvent {
            name: "Final only".to_string(),
            discipline,
            gender_category: GenderCategory::Mixed,
            points,
            team_size: (discipline == Discipline::Group).then_some(4),
        });
        let roster: Vec<RosterEntry> = podium.iter().map(|(entry, _)| *entry).collect();
        event.admit_roster(roster).unwrap();
        event.mark_current_round_final(true).unwrap();
        let entries = podium
            .iter()
            .map(|(entry, rank)| HeatEntry {
                entry: *entry,
                qualified: true,
                rank: Some(*rank),
            })
            .collect();
        event.close_heat(0, 1, entries).unwrap();
        event
    }

    #[test]
    fn test_group_placement_credits_department_once() {
        let dept = department("CSE");
        let members: Vec<Participant> = (1..=4)
            .map(|n| participant(n, Gender::Male, &dept))
            .collect();
        let team = Team {
            team_id: Uuid::new_v4(),
            name: "CSE A".to_string(),
            department_id: dept.department_id,
            event_id: Uuid::new_v4(),
            members: members.iter().map(|p| p.participant_id).collect(),
            created_at: Utc::now().naive_utc(),
        };
        let event = ranked_event(
            Discipline::Group,
            PointSchedule::new(10, 6, 4),
            &[(RosterEntry::Team(team.team_id), Rank::FIRST)],
        );

        let standings = compute_standings(&[event], &members, &[team], &[dept.clone()]);

        for member in &members {
            let stats = standings.participant(member.participant_id).unwrap();
            assert_eq!(stats.points, 10);
            assert_eq!(stats.medals.gold, 1);
        }
        let dept_stats = standings.department(dept.department_id).unwrap();
        assert_eq!(dept_stats.points, 10);
        assert_eq!(dept_stats.medals.gold, 1);
    }

    #[test]
    fn test_individual_second_place() {
        let dept = department("EEE");
        let a = participant(1, Gender::Female, &dept);
        let b = participant(2, Gender::Female, &dept);
        let event = ranked_event(
            Discipline::Individual,
            PointSchedule::new(5, 3, 1),
            &[
                (RosterEntry::Individual(a.participant_id), Rank::FIRST),
                (RosterEntry::Individual(b.participant_id), Rank::SECOND),
            ],
        );

        let standings = compute_standings(&[event], &[a.clone(), b.clone()], &[], &[dept.clone()]);

        let second = standings.participant(b.participant_id).unwrap();
        assert_eq!(second.points, 3);
        assert_eq!(second.medals.silver, 1);
        assert_eq!(second.medals.total(), 1);
        assert_eq!(standings.department(dept.department_id).unwrap().points, 8);
        assert_eq!(standings.participants[0].participant_id, a.participant_id);
    }

    #[test]
    fn test_unset_points_fall_back_per_discipline() {
        let dept = department("CIV");
        let a = participant(1, Gender::Male, &dept);
        let event = ranked_event(
            Discipline::Individual,
            PointSchedule::default(),
            &[(RosterEntry::Individual(a.participant_id), Rank::THIRD)],
        );

        let standings = compute_standings(&[event], &[a.clone()], &[], &[dept]);
        assert_eq!(standings.participant(a.participant_id).unwrap().points, 1);
    }

    #[test]
    fn test_achievements_cover_team_credits() {
        let dept = department("BIO");
        let members: Vec<Participant> = (1..=4)
            .map(|n| participant(n, Gender::Female, &dept))
            .collect();
        let team = Team {
            team_id: Uuid::new_v4(),
            name: "BIO relay".to_string(),
            department_id: dept.department_id,
            event_id: Uuid::new_v4(),
            members: members.iter().map(|p| p.participant_id).collect(),
            created_at: Utc::now().naive_utc(),
        };
        let relay = ranked_event(
            Discipline::Group,
            PointSchedule::default(),
            &[(RosterEntry::Team(team.team_id), Rank::SECOND)],
        );
        let solo = ranked_event(
            Discipline::Individual,
            PointSchedule::default(),
            &[(RosterEntry::Individual(members[0].participant_id), Rank::FIRST)],
        );

        let first = achievements_for(
            members[0].participant_id,
            &[relay.clone(), solo.clone()],
            &[team.clone()],
        );
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].team_id, Some(team.team_id));
        assert_eq!(first[0].points, 6);
        assert_eq!(first[1].medal, Medal::Gold);
        assert_eq!(first[1].points, 5);

        let other = achievements_for(members[3].participant_id, &[relay, solo], &[team]);
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_leaderboard_splits_by_gender_and_drops_zeros() {
        let dept = department("ARCH");
        let man = participant(1, Gender::Male, &dept);
        let woman = participant(2, Gender::Female, &dept);
        let idle = participant(3, Gender::Female, &dept);
        let event = ranked_event(
            Discipline::Individual,
            PointSchedule::new(5, 3, 1),
            &[
                (RosterEntry::Individual(man.participant_id), Rank::FIRST),
                (RosterEntry::Individual(woman.participant_id), Rank::SECOND),
            ],
        );

        let board: LeaderboardResponse =
            compute_standings(&[event], &[man, woman.clone(), idle], &[], &[dept]).into();
        assert_eq!(board.men.len(), 1);
        assert_eq!(board.women.len(), 1);
        assert_eq!(board.women[0].participant_id, woman.participant_id);
    }

    fn dataset() -> (Vec<Event>, Vec<Participant>, Vec<Team>, Vec<Department>) {
        let depts = vec![department("A"), department("B"), department("C")];
        let people: Vec<Participant> = (0..9)
            .map(|n| {
                let gender = if n % 2 == 0 { Gender::Male } else { Gender::Female };
                participant(n, gender, &depts[n as usize % 3])
            })
            .collect();
        let team = Team {
            team_id: Uuid::new_v4(),
            name: "Mixed four".to_string(),
            department_id: depts[1].department_id,
            event_id: Uuid::new_v4(),
            members: people[..4].iter().map(|p| p.participant_id).collect(),
            created_at: Utc::now().naive_utc(),
        };
        let events = vec![
            ranked_event(
                Discipline::Individual,
                PointSchedule::new(5, 3, 1),
                &[
                    (RosterEntry::Individual(people[4].participant_id), Rank::FIRST),
                    (RosterEntry::Individual(people[5].participant_id), Rank::SECOND),
                    (RosterEntry::Individual(people[6].participant_id), Rank::THIRD),
                ],
            ),
            ranked_event(
                Discipline::Individual,
                PointSchedule::new(5, 3, 1),
                &[
                    (RosterEntry::Individual(people[7].participant_id), Rank::FIRST),
                    (RosterEntry::Individual(people[8].participant_id), Rank::SECOND),
                ],
            ),
            ranked_event(
                Discipline::Group,
                PointSchedule::new(10, 6, 4),
                &[(RosterEntry::Team(team.team_id), Rank::THIRD)],
            ),
        ];
        (events, people, vec![team], depts)
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let (events, people, teams, depts) = dataset();
        let first = compute_standings(&events, &people, &teams, &depts);
        let second = compute_standings(&events, &people, &teams, &depts);
        assert_eq!(first, second);
    }

    fn reorder<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
        order.iter().map(|idx| items[*idx].clone()).collect()
    }

    proptest! {
        #[test]
        fn standings_ignore_input_order(
            event_order in Just(vec![0usize, 1, 2]).prop_shuffle(),
            people_order in Just((0..9usize).collect::<Vec<_>>()).prop_shuffle(),
            dept_order in Just(vec![0usize, 1, 2]).prop_shuffle(),
        ) {
            let (events, people, teams, depts) = dataset();
            let expected = compute_standings(&events, &people, &teams, &depts);

            let actual = compute_standings(
                &reorder(&events, &event_order),
                &reorder(&people, &people_order),
                &teams,
                &reorder(&depts, &dept_order),
            );
            prop_assert_eq!(actual, expected);
        }
    }
}
