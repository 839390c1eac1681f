//! Strict BVH parser.
//!
//! Builds the joint arena depth-first in pre-order, then reads exactly `Frames:` rows
//! of `total_channels` floats. A motion row is the set of values on one text line.
//! Any deviation is fatal; nothing is truncated or padded.

use hashbrown::HashSet;
use log::debug;
use nalgebra::Vector3;

use super::tokenizer::{parse_float, unexpected, Spanned, Token, Tokenizer};
use crate::clip::{Channel, Clip, Joint};
use crate::error::{ClipError, ParseError, ParseErrorKind};

/// Parse a complete BVH document into a validated [`Clip`].
pub fn parse_bvh(src: &str) -> Result<Clip, ParseError> {
    let mut parser = Parser {
        tok: Tokenizer::new(src),
        joints: Vec::new(),
        names: HashSet::new(),
        total_channels: 0,
    };
    parser.parse()
}

struct Parser<'a> {
    tok: Tokenizer<'a>,
    joints: Vec<Joint>,
    names: HashSet<String>,
    total_channels: usize,
}

impl<'a> Parser<'a> {
    fn parse(&mut self) -> Result<Clip, ParseError> {
        self.tok.expect_word("HIERARCHY")?;
        self.tok.expect_word("ROOT")?;
        self.parse_joint(None)?;

        let motion_tok = self.tok.expect_word("MOTION")?;
        let frames_tok = self.tok.expect_word("Frames:")?;
        let frame_count = self.tok.next_usize()?;
        if frame_count == 0 {
            return Err(ParseError::new(
                frames_tok.line,
                frames_tok.offset,
                ParseErrorKind::EmptyMotion,
            ));
        }
        let time_tok = self.tok.expect_word("Frame")?;
        self.tok.expect_word("Time:")?;
        let frame_time = self.tok.next_float()?;
        if frame_time <= 0.0 {
            return Err(ParseError::new(
                time_tok.line,
                time_tok.offset,
                ParseErrorKind::InvalidFrameTime { value: frame_time },
            ));
        }

        let total_channels = self.total_channels;
        let expected = frame_count.checked_mul(total_channels).ok_or_else(|| {
            ParseError::new(
                frames_tok.line,
                frames_tok.offset,
                ParseErrorKind::Invalid(ClipError::MotionTooLarge {
                    frame_count,
                    total_channels,
                }),
            )
        })?;
        let motion = self.parse_rows(frame_count, expected)?;
        let joints = std::mem::take(&mut self.joints);
        let joint_count = joints.len();
        let clip = Clip::new(joints, frame_count, frame_time, motion).map_err(|e| {
            ParseError::new(motion_tok.line, motion_tok.offset, ParseErrorKind::Invalid(e))
        })?;
        debug!(
            "parsed BVH clip: {} joints, {} channels, {} frames @ {:.4}s",
            joint_count,
            clip.total_channels(),
            frame_count,
            frame_time
        );
        Ok(clip)
    }

    /// Parse `<name> { ... }` after `ROOT`/`JOINT`. The joint is pushed before its
    /// children so arena order is pre-order.
    fn parse_joint(&mut self, parent: Option<usize>) -> Result<usize, ParseError> {
        let name_tok = self.tok.next_word("a joint name")?;
        let name = name_tok.token.as_str().to_string();
        if !self.names.insert(name.clone()) {
            return Err(ParseError::new(
                name_tok.line,
                name_tok.offset,
                ParseErrorKind::DuplicateJoint { name },
            ));
        }

        let index = self.joints.len();
        let mut joint = Joint::new(name.clone(), parent, Vector3::zeros());
        joint.channel_offset = self.total_channels;
        self.joints.push(joint);

        self.tok.expect_open()?;
        let mut seen_offset = false;
        let mut seen_channels = false;
        let mut seen_end_site = false;
        let mut seen_child = false;

        loop {
            let tok = self
                .tok
                .require("OFFSET, CHANNELS, JOINT, End Site or '}'")?;
            match tok.token {
                Token::CloseBrace => break,
                Token::Word("OFFSET") => {
                    if seen_offset {
                        return Err(duplicate(&tok, &name, "OFFSET"));
                    }
                    seen_offset = true;
                    let offset = self.read_vec3()?;
                    self.joints[index].offset = offset;
                }
                Token::Word("CHANNELS") => {
                    if seen_child {
                        return Err(ParseError::new(
                            tok.line,
                            tok.offset,
                            ParseErrorKind::ChannelsAfterChild { joint: name },
                        ));
                    }
                    if seen_channels {
                        return Err(duplicate(&tok, &name, "CHANNELS"));
                    }
                    seen_channels = true;
                    let channels = self.read_channels()?;
                    self.total_channels += channels.len();
                    self.joints[index].channels = channels;
                }
                Token::Word("JOINT") => {
                    seen_child = true;
                    self.parse_joint(Some(index))?;
                }
                Token::Word("End") => {
                    self.tok.expect_word("Site")?;
                    if seen_end_site {
                        return Err(duplicate(&tok, &name, "End Site"));
                    }
                    seen_end_site = true;
                    seen_child = true;
                    self.tok.expect_open()?;
                    self.tok.expect_word("OFFSET")?;
                    let tip = self.read_vec3()?;
                    let close = self.tok.require("'}'")?;
                    if close.token != Token::CloseBrace {
                        return Err(unexpected(&close, "'}'", close.token.as_str()));
                    }
                    self.joints[index].end_site = Some(tip);
                }
                other => {
                    return Err(unexpected(
                        &tok,
                        "OFFSET, CHANNELS, JOINT, End Site or '}'",
                        other.as_str(),
                    ))
                }
            }
        }
        Ok(index)
    }

    fn read_vec3(&mut self) -> Result<Vector3<f32>, ParseError> {
        let x = self.tok.next_float()?;
        let y = self.tok.next_float()?;
        let z = self.tok.next_float()?;
        Ok(Vector3::new(x, y, z))
    }

    fn read_channels(&mut self) -> Result<Vec<Channel>, ParseError> {
        let count = self.tok.next_usize()?;
        // The declared count is untrusted; growth past six is bounded by the text itself.
        let mut channels = Vec::with_capacity(count.min(6));
        for _ in 0..count {
            let tok = self.tok.next_word("a channel name")?;
            let name = tok.token.as_str();
            let channel = name.parse::<Channel>().map_err(|_| {
                ParseError::new(
                    tok.line,
                    tok.offset,
                    ParseErrorKind::UnknownChannel {
                        name: name.to_string(),
                    },
                )
            })?;
            channels.push(channel);
        }
        Ok(channels)
    }

    /// Read the motion block. Values are grouped into rows by source line.
    ///
    /// The buffer is sized from the remaining text, never from the `Frames:` header:
    /// every value takes at least one byte plus a separator.
    fn parse_rows(&mut self, frame_count: usize, expected: usize) -> Result<Vec<f32>, ParseError> {
        let width = self.total_channels;
        let mut motion = Vec::with_capacity(expected.min(self.tok.remaining() / 2 + 1));
        let mut rows = 0usize;
        let mut row_line = 0usize;
        let mut row_start: Option<Spanned<'a>> = None;
        let mut row_len = 0usize;

        while let Some(tok) = self.tok.next_token() {
            if tok.line != row_line {
                if let Some(start) = row_start.take() {
                    check_row(&start, rows, width, row_len)?;
                    rows += 1;
                }
                if rows == frame_count {
                    return Err(ParseError::new(
                        tok.line,
                        tok.offset,
                        ParseErrorKind::FrameCountMismatch {
                            declared: frame_count,
                            found: rows + 1,
                        },
                    ));
                }
                row_line = tok.line;
                row_start = Some(tok);
                row_len = 0;
            }
            let value = match tok.token {
                Token::Word(_) => parse_float(&tok)?,
                other => return Err(unexpected(&tok, "a number", other.as_str())),
            };
            motion.push(value);
            row_len += 1;
        }
        if let Some(start) = row_start {
            check_row(&start, rows, width, row_len)?;
            rows += 1;
        }

        // Rows of zero channels leave no tokens to count.
        if width == 0 {
            return Ok(motion);
        }
        if rows != frame_count {
            let (line, offset) = self.tok.position();
            return Err(ParseError::new(
                line,
                offset,
                ParseErrorKind::FrameCountMismatch {
                    declared: frame_count,
                    found: rows,
                },
            ));
        }
        Ok(motion)
    }
}

fn check_row(start: &Spanned<'_>, row: usize, width: usize, found: usize) -> Result<(), ParseError> {
    if found == width {
        Ok(())
    } else {
        Err(ParseError::new(
            start.line,
            start.offset,
            ParseErrorKind::RowLength {
                row,
                expected: width,
                found,
            },
        ))
    }
}

fn duplicate(tok: &Spanned<'_>, joint: &str, keyword: &str) -> ParseError {
    ParseError::new(
        tok.line,
        tok.offset,
        ParseErrorKind::DuplicateKeyword {
            joint: joint.to_string(),
            keyword: keyword.to_string(),
        },
    )
}
