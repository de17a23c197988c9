//! Aggregate engagement figures computed from raw per-video counts.

use serde::{Deserialize, Serialize};

/// Raw counters for one published video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStats {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub total_videos: usize,
    pub total_views: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    /// `(likes + comments + shares) / views * 100`, two decimals; "0.00" without views
    pub engagement_rate: String,
}

pub fn compute_insights(videos: &[VideoStats]) -> Insights {
    let total_views: u64 = videos.iter().map(|v| v.views).sum();
    let total_likes: u64 = videos.iter().map(|v| v.likes).sum();
    let total_comments: u64 = videos.iter().map(|v| v.comments).sum();
    let total_shares: u64 = videos.iter().map(|v| v.shares).sum();

    let interactions = total_likes + total_comments + total_shares;
    let engagement_rate = if total_views == 0 {
        "0.00".to_string()
    } else {
        format!("{:.2}", interactions as f64 / total_views as f64 * 100.0)
    };

    Insights {
        total_videos: videos.len(),
        total_views,
        total_likes,
        total_comments,
        total_shares,
        engagement_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_insights() {
        let videos = [
            VideoStats {
                views: 1000,
                likes: 100,
                comments: 50,
                shares: 25,
            },
            VideoStats {
                views: 2000,
                likes: 200,
                comments: 100,
                shares: 50,
            },
        ];

        let insights = compute_insights(&videos);
        assert_eq!(insights.total_videos, 2);
        assert_eq!(insights.total_views, 3000);
        assert_eq!(insights.total_likes, 300);
        assert_eq!(insights.total_comments, 150);
        assert_eq!(insights.total_shares, 75);
        assert_eq!(insights.engagement_rate, "17.50");
    }

    #[test]
    fn test_empty_video_list() {
        let insights = compute_insights(&[]);
        assert_eq!(insights.total_videos, 0);
        assert_eq!(insights.total_views, 0);
        assert_eq!(insights.engagement_rate, "0.00");
    }

    #[test]
    fn test_zero_views() {
        let insights = compute_insights(&[VideoStats {
            likes: 3,
            ..Default::default()
        }]);
        assert_eq!(insights.total_videos, 1);
        assert_eq!(insights.engagement_rate, "0.00");
    }

    #[test]
    fn test_rounding() {
        let insights = compute_insights(&[VideoStats {
            views: 3,
            likes: 1,
            comments: 0,
            shares: 0,
        }]);
        assert_eq!(insights.engagement_rate, "33.33");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(compute_insights(&[])).unwrap();
        assert_eq!(json["engagementRate"], "0.00");
        assert_eq!(json["totalVideos"], 0);
    }
}
