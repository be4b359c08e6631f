// Comments, likes, tweets, playlists and subscriptions (set TEST_MONGODB_URI)

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn comments_are_created_listed_and_owned() -> Result<()> {
    if !common::db_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let author = common::new_session(server, "cmt").await?;
    let other = common::new_session(server, "cmo").await?;
    let video = common::upload_video(server, &author, "Discussed").await?;
    let on_video = server.api(&format!("/comments/c/{}", video));

    let res = other.client.post(&on_video).json(&json!({ "content": "  " })).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Content is required");

    let res = other.client.post(&on_video).json(&json!({ "content": "Nice one" })).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["statusCode"], 201);
    let comment = body["data"]["_id"].as_str().unwrap().to_string();

    let (_, body) = common::envelope(author.client.get(&on_video).send().await?).await?;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["comments"][0]["content"], "Nice one");
    assert_eq!(body["data"]["comments"][0]["ownerDetails"]["username"], other.username.as_str());

    let on_comment = server.api(&format!("/comments/c/{}", comment));
    let res = author.client.patch(&on_comment).json(&json!({ "content": "mine now" })).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = other.client.patch(&on_comment).json(&json!({ "content": "Edited" })).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "Edited");

    let (status, _) = common::envelope(other.client.delete(&on_comment).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(other.client.delete(&on_comment).send().await?.status(), StatusCode::NOT_FOUND);

    let missing = server.api(&format!("/comments/c/{}", "64b7f0c2a1b2c3d4e5f60718"));
    let res = other.client.post(&missing).json(&json!({ "content": "hello?" })).send().await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Video not found");
    Ok(())
}

#[tokio::test]
async fn likes_toggle_on_and_off() -> Result<()> {
    if !common::db_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::new_session(server, "lk").await?;
    let video = common::upload_video(server, &session, "Likeable").await?;
    let url = server.api(&format!("/likes/c/{}", video));

    let (status, body) = common::envelope(session.client.post(&url).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Video liked successfully");
    assert_eq!(body["data"]["video"], video.as_str());

    let (_, body) =
        common::envelope(session.client.get(server.api("/likes/likedVideos")).send().await?).await?;
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let (_, body) = common::envelope(session.client.post(&url).send().await?).await?;
    assert_eq!(body["message"], "Video unliked successfully");
    assert_eq!(body["data"], json!({}));

    let (_, body) =
        common::envelope(session.client.get(server.api("/likes/likedVideos")).send().await?).await?;
    assert_eq!(body["data"]["pagination"]["total"], 0);
    assert_eq!(body["data"]["likedVideos"], json!([]));

    let res = session
        .client
        .post(server.api("/likes/tweet/64b7f0c2a1b2c3d4e5f60718"))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tweet not found");
    Ok(())
}

#[tokio::test]
async fn tweets_lifecycle() -> Result<()> {
    if !common::db_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::new_session(server, "tw").await?;
    let create = server.api("/tweets/createTweet");

    let (status, body) = common::envelope(
        session.client.post(&create).json(&json!({ "content": "hello world" })).send().await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let tweet = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, body) = common::envelope(
        session.client.post(&create).json(&json!({ "content": "hello world" })).send().await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "The tweet already exists");

    let like = server.api(&format!("/likes/tweet/{}", tweet));
    let (_, body) = common::envelope(session.client.post(&like).send().await?).await?;
    assert_eq!(body["message"], "Tweet liked successfully");

    let (_, body) = common::envelope(
        session
            .client
            .get(server.api(&format!("/tweets/user/{}", session.id)))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(body["data"]["tweets"][0]["likesCount"], 1);
    assert_eq!(body["data"]["tweets"][0]["isLiked"], true);

    let url = server.api(&format!("/tweets/c/{}", tweet));
    let (status, body) = common::envelope(
        session.client.patch(&url).json(&json!({ "content": "edited" })).send().await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "edited");

    assert_eq!(session.client.delete(&url).send().await?.status(), StatusCode::OK);
    assert_eq!(session.client.delete(&url).send().await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn playlists_hold_published_videos() -> Result<()> {
    if !common::db_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let session = common::new_session(server, "pl").await?;
    let shown = common::upload_video(server, &session, "Shown").await?;
    let hidden = common::upload_video(server, &session, "Hidden").await?;
    session
        .client
        .post(server.api(&format!("/videos/c/{}", hidden)))
        .send()
        .await?;

    let (status, body) = common::envelope(
        session
            .client
            .post(server.api("/playlists/create-playlist"))
            .json(&json!({ "name": "Mix", "description": "stuff", "videos": [shown] }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let playlist = body["data"]["_id"].as_str().unwrap().to_string();

    let res = session
        .client
        .patch(server.api(&format!("/playlists/add/{}/{}", playlist, hidden)))
        .send()
        .await?;
    let (_, body) = common::envelope(res).await?;
    assert_eq!(body["data"]["videos"].as_array().unwrap().len(), 2);

    let res = session
        .client
        .get(server.api(&format!("/playlists/c/{}/videos", playlist)))
        .send()
        .await?;
    let (_, body) = common::envelope(res).await?;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Shown"]);

    let res = session
        .client
        .patch(server.api(&format!("/playlists/c/{}", playlist)))
        .json(&json!({}))
        .send()
        .await?;
    let (status, body) = common::envelope(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name or description is required");

    let res = session
        .client
        .patch(server.api(&format!("/playlists/remove/{}/{}", playlist, shown)))
        .send()
        .await?;
    let (_, body) = common::envelope(res).await?;
    assert_eq!(body["data"]["videos"], json!([hidden]));

    let res = session
        .client
        .get(server.api(&format!("/playlists/user/{}", session.id)))
        .send()
        .await?;
    let (_, body) = common::envelope(res).await?;
    assert_eq!(body["data"]["playlists"][0]["name"], "Mix");
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let url = server.api(&format!("/playlists/c/{}", playlist));
    assert_eq!(session.client.delete(&url).send().await?.status(), StatusCode::OK);
    assert_eq!(session.client.get(&url).send().await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn subscriptions_toggle_and_list_both_ways() -> Result<()> {
    if !common::db_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let channel = common::new_session(server, "ch").await?;
    let fan = common::new_session(server, "sub").await?;
    let url = server.api(&format!("/subscription/c/{}", channel.id));

    let (status, body) = common::envelope(channel.client.post(&url).send().await?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot subscribe to your own channel");

    let (_, body) = common::envelope(fan.client.post(&url).send().await?).await?;
    assert_eq!(body["message"], "The channel subscribed successfully");

    let (_, body) = common::envelope(channel.client.get(&url).send().await?).await?;
    assert_eq!(body["data"]["subscriberCount"], 1);
    assert_eq!(body["data"]["subscribers"][0]["subscriber"]["username"], fan.username.as_str());

    let mine = server.api(&format!("/subscription/u/{}", fan.id));
    let (_, body) = common::envelope(fan.client.get(&mine).send().await?).await?;
    assert_eq!(body["data"]["channels"][0]["channel"]["username"], channel.username.as_str());

    let (_, body) = common::envelope(
        fan.client
            .get(server.api(&format!("/users/c/{}", channel.username)))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(body["data"]["subscribersCount"], 1);
    assert_eq!(body["data"]["isSubscribed"], true);

    let (_, body) = common::envelope(fan.client.post(&url).send().await?).await?;
    assert_eq!(body["message"], "The channel unsubscribed successfully");
    let (_, body) = common::envelope(channel.client.get(&url).send().await?).await?;
    assert_eq!(body["data"]["subscriberCount"], 0);
    let (_, body) = common::envelope(fan.client.get(&mine).send().await?).await?;
    assert_eq!(body["data"]["pagination"]["total"], 0);
    assert_eq!(body["data"]["channels"], json!([]));
    Ok(())
}

#[tokio::test]
async fn concurrent_toggles_leave_at_most_one_row() -> Result<()> {
    if !common::db_enabled() {
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let owner = common::new_session(server, "race").await?;
    let fan = common::new_session(server, "racer").await?;
    let video = common::upload_video(server, &owner, "Raced").await?;

    let like = server.api(&format!("/likes/c/{}", video));
    let (a, b) = tokio::join!(fan.client.post(&like).send(), fan.client.post(&like).send());
    assert_eq!(a?.status(), StatusCode::OK);
    assert_eq!(b?.status(), StatusCode::OK);

    let (_, body) =
        common::envelope(fan.client.get(server.api("/likes/likedVideos")).send().await?).await?;
    let liked = body["data"]["pagination"]["total"].as_u64().unwrap();
    assert!(liked <= 1, "found {} like rows", liked);

    let subscribe = server.api(&format!("/subscription/c/{}", owner.id));
    let (a, b) = tokio::join!(fan.client.post(&subscribe).send(), fan.client.post(&subscribe).send());
    assert_eq!(a?.status(), StatusCode::OK);
    assert_eq!(b?.status(), StatusCode::OK);

    let (_, body) = common::envelope(
        fan.client
            .get(server.api(&format!("/subscription/u/{}", fan.id)))
            .send()
            .await?,
    )
    .await?;
    let subscribed = body["data"]["pagination"]["total"].as_u64().unwrap();
    assert!(subscribed <= 1, "found {} subscription rows", subscribed);
    Ok(())
}
