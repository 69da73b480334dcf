// Lookup indices over a flow response.

use std::collections::HashMap;

use crate::model::flow::{FlowBlock, FlowPlay, FlowResponse};
use crate::model::game::SocialPost;

/// A flow block together with what the indices could resolve for it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedBlock<'a> {
    pub block: &'a FlowBlock,
    pub period_range: Option<String>,
    pub embedded_post: Option<&'a SocialPost>,
}

/// Play-id and post-id indices for one game's flow.
#[derive(Debug, Clone)]
pub struct FlowIndex<'a> {
    blocks: &'a [FlowBlock],
    plays: HashMap<i64, &'a FlowPlay>,
    posts: HashMap<i64, &'a SocialPost>,
}

impl<'a> FlowIndex<'a> {
    pub fn new(flow: &'a FlowResponse, posts: &'a [SocialPost]) -> Self {
        Self {
            blocks: &flow.blocks,
            plays: flow.plays.iter().map(|p| (p.play_id, p)).collect(),
            posts: posts.iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn play(&self, play_id: i64) -> Option<&'a FlowPlay> {
        self.plays.get(&play_id).copied()
    }

    /// Human-readable period/clock span of a block, or `None` when none of
    /// its play ids resolve.
    pub fn period_range(&self, block: &FlowBlock) -> Option<String> {
        let resolved: Vec<&FlowPlay> = block
            .play_ids
            .iter()
            .filter_map(|id| self.play(*id))
            .collect();
        let start = resolved.iter().min_by_key(|p| p.play_index)?;
        let end = resolved.iter().max_by_key(|p| p.play_index)?;

        let clocks = match (start.clock.as_deref(), end.clock.as_deref()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        };

        let range = if start.period == end.period {
            match clocks {
                Some((a, b)) => format!("Period {} \u{b7} {a}\u{2013}{b}", start.period),
                None => format!("Period {}", start.period),
            }
        } else {
            match clocks {
                Some((a, b)) => {
                    format!("Period {} {a} \u{2013} Period {} {b}", start.period, end.period)
                }
                None => format!("Period {}\u{2013}Period {}", start.period, end.period),
            }
        };
        Some(range)
    }

    /// The social post a block embeds, if it references one we know.
    pub fn embedded_post(&self, block: &FlowBlock) -> Option<&'a SocialPost> {
        block
            .embedded_social_post_id
            .and_then(|id| self.posts.get(&id).copied())
    }

    /// Every block in narrative order with its range and post resolved.
    pub fn decorate(&self) -> Vec<DecoratedBlock<'a>> {
        let mut blocks: Vec<&'a FlowBlock> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.block_index);
        blocks
            .into_iter()
            .map(|block| DecoratedBlock {
                block,
                period_range: self.period_range(block),
                embedded_post: self.embedded_post(block),
            })
            .collect()
    }
}
