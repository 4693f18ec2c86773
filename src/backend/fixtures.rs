//! Feed documents shared by the unit tests.

pub const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itms="http://phobos.apple.com/rss/1.0/modules/itms/">
  <channel>
    <title>iTunes Store: New Releases</title>
    <category>Music</category>
    <item>
      <title>Thriller</title>
      <category>Pop</category>
      <itms:artist>Michael Jackson</itms:artist>
      <itms:album>Thriller (Special Edition)</itms:album>
      <itms:releasedate>November 30, 1982</itms:releasedate>
      <itms:coverArt height="60" width="60">http://example.com/60.jpg</itms:coverArt>
    </item>
    <item>
      <title>Rock &amp; Roll</title>
      <category><![CDATA[Rock]]></category>
      <itms:artist>Led Zeppelin</itms:artist>
      <itms:album>Led Zeppelin IV</itms:album>
      <itms:releasedate>sometime in 1971</itms:releasedate>
    </item>
    <item>
      <title>Empty Fields</title>
      <itms:album/>
    </item>
  </channel>
</rss>
"#;

/// A well-formed feed with `n` fully populated items.
pub fn feed_with_items(n: usize) -> String {
    let mut feed = String::from(
        "<?xml version=\"1.0\"?>\n<rss xmlns:itms=\"http://phobos.apple.com/rss/1.0/modules/itms/\"><channel><title>Top</title>\n",
    );
    for i in 0..n {
        feed.push_str(&format!(
            "<item><title>Song {i}</title><category>Genre {g}</category>\
             <itms:artist>Artist {i}</itms:artist><itms:album>Album {i}</itms:album>\
             <itms:releasedate>January {d}, 2024</itms:releasedate></item>\n",
            i = i,
            g = i % 3,
            d = i % 28 + 1,
        ));
    }
    feed.push_str("</channel></rss>\n");
    feed
}
