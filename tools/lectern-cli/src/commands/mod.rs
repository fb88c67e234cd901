pub mod captions;
pub mod check;
pub mod compile;
pub mod info;

use std::path::Path;

use lectern_lecture_model::LectureContent;

/// Load a lecture file, or `None` (after telling the user) when it has no
/// content to play.
pub fn load_lecture(path: &Path) -> anyhow::Result<Option<LectureContent>> {
    let lecture = LectureContent::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load lecture: {e}"))?;
    if lecture.is_blank() {
        println!("No lecture to play.");
        println!("Generate a lecture first, then open it with lectern.");
        return Ok(None);
    }
    Ok(Some(lecture))
}
