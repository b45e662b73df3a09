//! Requests sharing a destination must each get the file they downloaded,
//! even when yt-dlp cannot describe the output.

#![cfg(unix)]

mod common;

use std::collections::HashSet;

use tempfile::TempDir;

use common::{collect, tool_orchestrator, FAKE_FFMPEG};

/// yt-dlp whose metadata query fails; the download writes `<last url
/// segment>.mp3`, with `b` finishing after `a` has written its file.
const YTDLP_NO_METADATA: &str = r#"
case "$1" in --version) echo 2024.01.01; exit 0 ;; esac
home=""
json=0
url=""
while [ $# -gt 0 ]; do
  case "$1" in
    --dump-single-json) json=1 ;;
    -P)
      case "$2" in
        temp:*) ;;
        *) home="$2" ;;
      esac
      ;;
  esac
  url="$1"
  shift
done
if [ "$json" = 1 ]; then
  echo "ERROR: Unable to extract metadata" >&2
  exit 1
fi
name="${url##*/}"
if [ "$name" = b ]; then sleep 0.3; fi
echo "[download] 100% of 1.00MiB in 00:00:01"
printf '%s' "$name" > "$home/$name.mp3"
"#;

#[tokio::test]
async fn test_shared_destination_keeps_requests_apart() {
    let tools = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let orchestrator = tool_orchestrator(tools.path(), YTDLP_NO_METADATA, FAKE_FFMPEG);

    // Different files written close together
    let a = orchestrator.submit("https://x/a", dest.path(), "audio").await.unwrap();
    let b = orchestrator.submit("https://x/b", dest.path(), "audio").await.unwrap();
    let (_, a) = collect(a).await;
    let (_, b) = collect(b).await;

    let a_path = a.final_file_path.clone().unwrap();
    let b_path = b.final_file_path.clone().unwrap();
    assert!(a.is_success() && b.is_success());
    assert_eq!(a_path, dest.path().join("a.mp3"));
    assert_eq!(b_path, dest.path().join("b.mp3"));
    assert_eq!(std::fs::read_to_string(&a_path).unwrap(), "a");
    assert_eq!(std::fs::read_to_string(&b_path).unwrap(), "b");

    // Same file name from two requests: neither overwrites the other
    let first = orchestrator.submit("https://x/same", dest.path(), "audio").await.unwrap();
    let second = orchestrator.submit("https://x/same", dest.path(), "audio").await.unwrap();
    let (_, first) = collect(first).await;
    let (_, second) = collect(second).await;

    let placed: HashSet<_> = [first.final_file_path.unwrap(), second.final_file_path.unwrap()]
        .into_iter()
        .collect();
    let expected: HashSet<_> = [dest.path().join("same.mp3"), dest.path().join("same (1).mp3")]
        .into_iter()
        .collect();
    assert_eq!(placed, expected);

    // No scratch directories left behind
    let mut names: Vec<String> = std::fs::read_dir(dest.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.mp3", "b.mp3", "same (1).mp3", "same.mp3"]);
}
