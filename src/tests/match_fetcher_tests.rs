use crate::match_fetcher::MatchFetcher;
use crate::models::{MatchKind, MatchSummary};
use crate::profile_resolver::ProfileResolver;
use crate::store::MemoryStore;
use crate::tests::support::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn fetcher_with(api: Arc<MockApi>, page_size: usize) -> MatchFetcher {
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(ProfileResolver::new(api.clone(), store));
    MatchFetcher::new(api, resolver).with_page_size(page_size)
}

#[tokio::test]
async fn pagination_terminates_on_empty_page() {
    let api = Arc::new(MockApi::new());
    api.add_profiles(8);
    for i in 0..12 {
        api.add_standard_match(&format!("m-{i}"), "Ranked:Slayer", 50, 1);
    }
    let fetcher = fetcher_with(api.clone(), 5);

    let matches = fetcher
        .fetch_matches(1, 100, MatchKind::Custom)
        .await
        .unwrap();

    assert_eq!(matches.len(), 12);
    // Pages of 5, 5, 2, then the empty page that stops the loop.
    assert_eq!(api.history_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn stops_once_target_count_is_reached() {
    let api = Arc::new(MockApi::new());
    api.add_profiles(8);
    for i in 0..12 {
        api.add_standard_match(&format!("m-{i}"), "Ranked:Slayer", 50, 1);
    }
    let fetcher = fetcher_with(api.clone(), 25);

    let matches = fetcher.fetch_matches(1, 3, MatchKind::Custom).await.unwrap();

    assert_eq!(matches.len(), 3);
    assert_eq!(api.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn discovery_order_is_preserved() {
    let api = Arc::new(MockApi::new());
    api.add_profiles(8);
    for name in ["newest", "middle", "oldest"] {
        api.add_standard_match(name, "Ranked:Slayer", 50, 1);
    }
    let fetcher = fetcher_with(api.clone(), 25);

    let matches = fetcher
        .fetch_matches(1, 10, MatchKind::Custom)
        .await
        .unwrap();

    let ids: Vec<&str> = matches.iter().map(|m| m.match_id()).collect();
    assert_eq!(ids, vec!["newest", "middle", "oldest"]);
}

#[tokio::test]
async fn ranked_filter_keeps_only_ranked_playlists() {
    let api = Arc::new(MockApi::new());
    api.add_profiles(8);
    api.playlists
        .lock()
        .insert("pl-ranked".to_string(), asset("pl-ranked", "Ranked Arena"));
    api.playlists
        .lock()
        .insert("pl-social".to_string(), asset("pl-social", "Quick Play"));
    api.gamemodes
        .lock()
        .insert("gm-1".to_string(), asset("gm-1", "Ranked:Slayer"));

    for (id, playlist) in [
        ("ranked-1", Some("pl-ranked")),
        ("social-1", Some("pl-social")),
        ("custom-1", None),
    ] {
        let info = match_info(after_cutoff(), 12, true, playlist);
        let summary = MatchSummary {
            match_id: id.to_string(),
            match_info: info.clone(),
        };
        let stats = match_stats(id, info, vec![team(0, 50, 1), team(1, 0, 0)], full_lobby());
        api.add_match(summary, stats);
    }
    let fetcher = fetcher_with(api.clone(), 25);

    let matches = fetcher
        .fetch_matches(1, 10, MatchKind::Ranked)
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].match_id(), "ranked-1");
    assert_eq!(
        matches[0].playlist.as_ref().unwrap().public_name,
        "Ranked Arena"
    );
}

#[tokio::test]
async fn missing_assets_degrade_to_none() {
    let api = Arc::new(MockApi::new());
    api.add_profiles(8);
    api.add_standard_match("m-1", "Ranked:Slayer", 50, 1);
    // Simulate 404s from the discovery service.
    api.maps.lock().clear();
    api.gamemodes.lock().clear();
    let fetcher = fetcher_with(api.clone(), 25);

    let matches = fetcher
        .fetch_matches(1, 10, MatchKind::Custom)
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches[0].map.is_none());
    assert!(matches[0].gamemode.is_none());
}

#[tokio::test]
async fn participants_include_bots_and_humans() {
    let api = Arc::new(MockApi::new());
    api.add_profiles(2);

    let info = match_info(after_cutoff(), 12, true, None);
    let summary = MatchSummary {
        match_id: "m-1".to_string(),
        match_info: info.clone(),
    };
    let stats = match_stats(
        "m-1",
        info,
        vec![team(0, 50, 1), team(1, 0, 0)],
        vec![human_player(1, true), human_player(2, true), bot_player("bid(1.0)")],
    );
    api.add_match(summary, stats);
    let fetcher = fetcher_with(api.clone(), 25);

    let matches = fetcher
        .fetch_matches(1, 10, MatchKind::Custom)
        .await
        .unwrap();

    let participants = &matches[0].participants;
    assert_eq!(participants.len(), 3);
    assert_eq!(participants.iter().filter(|p| p.is_human()).count(), 2);
    assert_eq!(
        participants.iter().filter(|p| !p.is_human()).count(),
        1
    );
}
