//! Prompt templates. Each one ends by pinning the reply to a bare JSON array,
//! which is what the parsers downstream look for.

use crate::config::ConceptPolicy;

pub(crate) fn segmentation(numbered_lines: &str, min_guide: usize, max_guide: usize) -> String {
    format!(
        "You are editing a lecture transcript. The lines below are one PART of a longer transcript,\n\
         each prefixed with its line id in square brackets.\n\
         Group the lines into coherent segments by deciding where each segment ENDS.\n\n\
         GUIDELINES:\n\
         1. Aim for {min_guide} to {max_guide} lines per segment.\n\
         2. A segment must finish a thought or sentence; that matters more than the line count.\n\
         3. Report only the ids of the lines on which a segment ends.\n\n\
         TRANSCRIPT PART:\n\
         --- START ---\n\
         {numbered_lines}\n\
         --- END ---\n\n\
         OUTPUT:\n\
         Reply with nothing but a JSON list of integers, for example [105, 130, 155]."
    )
}

pub(crate) fn cleansing(quoted_segments: &str) -> String {
    format!(
        "You are a video editor cleaning up a recorded lecture. Decide which of the segments below\n\
         should be CUT so the remaining lecture plays cleanly.\n\n\
         QUESTIONS ASKED BY THE INSTRUCTOR (ALWAYS KEEP):\n\
         The instructor often opens a topic with a question and answers it straight away\n\
         (\"So what is marketing? Marketing is...\"). Speaker names are not available, so judge by context:\n\
         a question that works as a headline for what follows belongs to the lesson.\n\n\
         INTERACTIONS WITH STUDENTS (DECIDE ON THE ANSWER):\n\
         Keep a question and its answer when the instructor's reply\n\
         - explains the idea in a new way or adds depth missing from the main flow,\n\
         - gives a concrete example, analogy or case, or\n\
         - corrects a misconception worth hearing.\n\n\
         CUT A SEGMENT ONLY WHEN IT IS:\n\
         1. A request to repeat something, answered by plain repetition.\n\
         2. Course logistics: exams, grades, breaks, timing.\n\
         3. Technical or room trouble: audio, screen sharing, font size.\n\
         4. An empty acknowledgement (\"Okay, I see.\" / \"Good.\").\n\
         5. A transcription glitch such as looping words (\"going to going to going to\").\n\n\
         WHEN IN DOUBT about who is speaking, assume it is the instructor and KEEP the segment.\n\
         Cut only what you are certain is an interruption.\n\n\
         TRANSCRIPT BATCH:\n\
         --- START ---\n\
         {quoted_segments}\n\
         --- END ---\n\n\
         OUTPUT:\n\
         Reply with nothing but a JSON array of objects such as\n\
         [{{\"id\": \"seg_12\", \"reason\": \"Student asks for the slide to be repeated\"}}].\n\
         If nothing should be cut, reply with []."
    )
}

pub(crate) fn cluster(segments_json: &str, policy: &ConceptPolicy) -> String {
    let ConceptPolicy {
        min_group,
        max_group,
        min_clips,
    } = *policy;
    format!(
        "You turn long lectures into short standalone videos that each teach exactly one concept.\n\
         The segments below are the cleaned transcript of one lecture, in speaking order.\n\n\
         GOAL: produce AT LEAST {min_clips} clips. Scan the whole list; do not stop after the first few matches.\n\n\
         RULES:\n\
         1. Every clip uses between {min_group} and {max_group} segments. Fewer or more is not allowed.\n\
         2. Segments in a clip do not have to be adjacent, as long as they cover the same concept.\n\
            Use this to fill out a topic that looks thin.\n\
         3. Copy each chosen segment's text whole and unchanged. Do not shorten, summarize,\n\
            reword or add anything.\n\
         4. Start boundary: look at the segment right before your first one. If your first segment\n\
            continues an explanation or example begun there, include it or start elsewhere.\n\
            The first segment must introduce something new.\n\
         5. End boundary: look at the segment right after your last one. If your last segment leaves\n\
            a thought open or promises something delivered there, include it or end elsewhere.\n\
         6. Skipped neighbours: when you jump over segments, check that none of them holds context a\n\
            chosen segment relies on (\"this process\" explained in a segment you left out).\n\n\
         SEGMENTS:\n\
         {segments_json}\n\n\
         OUTPUT:\n\
         Reply with nothing but a JSON list. Each object has:\n\
         - \"merged_text\": the chosen segments' texts joined together\n\
         - \"start\": the start time of the first segment used\n\
         - \"end\": the end time of the last segment used\n\
         - \"big_segments_used\": the ids of the segments used, as strings\n\
         - \"vid_title\": a short descriptive title based on the merged text\n\
         - \"reasoning\": why each chosen segment belongs, and why each skipped neighbour was left out"
    )
}

pub(crate) fn finalize(clips_json: &str) -> String {
    format!(
        "Final quality check on merged lecture clips.\n\
         Each clip should work as a 3 to 5 minute video (roughly 400 to 800 words).\n\
         Keep only clips that are self-contained. Drop any clip that sounds like an intro or an outro.\n\
         Return the clips you keep exactly as given.\n\n\
         CLIPS:\n\
         {clips_json}\n\n\
         OUTPUT:\n\
         Reply with nothing but a JSON list of the clips you keep."
    )
}
