use anyhow::Result;

use super::ResponseDecoder;

#[tokio::test]
async fn it_accumulates_streamed_content() -> Result<()> {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"he\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let res = reqwest::get(format!("{url}/stream", url = server.url())).await?;
    let reply = ResponseDecoder::decode_stream(res).await?;
    mock.assert_async().await;

    assert_eq!(reply.transcript, "hello");
    assert!(reply.audio_fragments.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_collects_audio_fragments_in_order() -> Result<()> {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"audio\":{\"transcript\":\"hi \",\"data\":\"QU\"}}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"audio\":{\"transcript\":\"there\",\"data\":\"JD\"}}}]}\n\n",
        "data: [DONE]\n\n",
    );

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let res = reqwest::get(format!("{url}/stream", url = server.url())).await?;
    let reply = ResponseDecoder::decode_stream(res).await?;
    mock.assert_async().await;

    assert_eq!(reply.transcript, "hi there");
    assert_eq!(reply.audio_fragments, vec!["QU".to_string(), "JD".to_string()]);
    assert_eq!(reply.joined_audio(), "QUJD");

    return Ok(());
}

#[test]
fn it_skips_malformed_records() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"good\"}}]}\n",
        "data: {not json at all\n",
        ": comment line\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" parts\"}}]}\n",
        "data: [DONE]\n",
    );

    let reply = ResponseDecoder::decode_sse_text(body);
    assert_eq!(reply.transcript, "good parts");
}

#[test]
fn it_decodes_buffered_event_streams() {
    // A proxy may hand the whole stream transcript over without the
    // streaming content type; the buffered path must parse it identically.
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"hey\"}}]}\n\ndata: [DONE]\n\n";

    let reply = ResponseDecoder::decode_buffered(body).unwrap();
    assert_eq!(reply.transcript, "hey");
}

#[test]
fn it_prefers_the_audio_transcript_in_json_responses() {
    let body = "{\"choices\":[{\"message\":{\"content\":null,\"audio\":{\"transcript\":\"hi\",\"data\":\"QUJD\"}}}]}";

    let reply = ResponseDecoder::decode_buffered(body).unwrap();
    assert_eq!(reply.transcript, "hi");
    assert_eq!(reply.audio_fragments, vec!["QUJD".to_string()]);
}

#[test]
fn it_prefers_audio_over_plain_content() {
    let body = "{\"choices\":[{\"message\":{\"content\":\"text form\",\"audio\":{\"transcript\":\"spoken form\"}}}]}";

    let reply = ResponseDecoder::decode_buffered(body).unwrap();
    assert_eq!(reply.transcript, "spoken form");
}

#[test]
fn it_falls_back_to_a_delta_shaped_choice() {
    let body = "{\"choices\":[{\"delta\":{\"audio\":{\"transcript\":\"delta speech\"}}}]}";

    let reply = ResponseDecoder::decode_buffered(body).unwrap();
    assert_eq!(reply.transcript, "delta speech");
}

#[test]
fn it_reports_empty_replies_as_anomalies() {
    let reply = ResponseDecoder::decode_buffered("{\"choices\":[]}").unwrap();
    assert!(reply.is_empty());
}

#[test]
fn it_rejects_unparseable_json_bodies() {
    let res = ResponseDecoder::decode_buffered("<html>bad gateway</html>");
    assert!(res.is_err());
}
