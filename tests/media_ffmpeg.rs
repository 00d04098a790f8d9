#[cfg(feature = "media-ffmpeg")]
mod media_ffmpeg {
    use std::path::Path;
    use std::process::Command;

    use storyreel::{
        Canvas, CoverConfig, CoverMode, CoverRenderer, FfmpegEncoder, FfprobeProbe, MediaProbe,
        SubtitleCue, VideoComposer, is_program_available,
    };

    fn ffmpeg_tools_available() -> bool {
        is_program_available("ffmpeg", "-version") && is_program_available("ffprobe", "-version")
    }

    fn subtitles_filter_available() -> bool {
        Command::new("ffmpeg")
            .args(["-hide_banner", "-filters"])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(" subtitles "))
            .unwrap_or(false)
    }

    fn synth_tone(path: &Path, seconds: f64) -> anyhow::Result<()> {
        let status = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-y",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=440:sample_rate=44100",
                "-t",
                &format!("{seconds}"),
                "-c:a",
                "pcm_s16le",
            ])
            .arg(path)
            .status()?;
        anyhow::ensure!(status.success(), "ffmpeg failed creating tone");
        Ok(())
    }

    fn small_cover(path: &Path) -> anyhow::Result<()> {
        let cfg = CoverConfig {
            canvas: Canvas {
                width: 180,
                height: 320,
            },
            margin: 10,
            mode: CoverMode::Background,
            ..CoverConfig::default()
        };
        CoverRenderer::background_only(cfg)?.render_background(path)?;
        Ok(())
    }

    #[test]
    fn probe_reads_synthesized_tone_duration() {
        if !ffmpeg_tools_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("tone.wav");
        synth_tone(&audio, 2.0).unwrap();

        let d = FfprobeProbe::default().probe_duration(&audio).unwrap();
        assert!((d - 2.0).abs() < 0.1, "duration {d}");
    }

    #[test]
    fn composed_video_matches_audio_duration() {
        if !ffmpeg_tools_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio.wav");
        let cover = dir.path().join("cover.png");
        synth_tone(&audio, 12.4).unwrap();
        small_cover(&cover).unwrap();

        let cues = [
            SubtitleCue {
                index: 1,
                start: 0.0,
                end: 6.1,
                text: "正文第一行".to_string(),
            },
            SubtitleCue {
                index: 2,
                start: 6.2,
                end: 12.3,
                text: "正文第二行".to_string(),
            },
        ];
        let with_subs = subtitles_filter_available();

        let composer = VideoComposer::new(
            Box::new(FfprobeProbe::default()),
            Box::new(FfmpegEncoder::default()),
        );
        let out = dir.path().join("out").join("video.mp4");
        let composed = composer
            .compose(&cover, &audio, with_subs.then_some(&cues[..]), &out)
            .unwrap();
        assert!(out.is_file());

        let video_duration = FfprobeProbe::default().probe_duration(&out).unwrap();
        assert!(
            (video_duration - composed.duration_sec).abs() <= 0.1,
            "video {video_duration} vs audio {}",
            composed.duration_sec
        );
    }
}
