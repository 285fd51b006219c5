use std::time::Duration;

use declaration_submit::browser::{BrowserDriver, ChromeLauncher, DriverFactory};
use declaration_submit::models::{Credentials, Selector};
use declaration_submit::Config;

fn config() -> Config {
    let mut config = Config::with_credentials(Credentials {
        username: String::new(),
        password: String::new(),
        tax_id: String::new(),
        email: String::new(),
    });
    config.browser_headless = true;
    config
}

#[tokio::test]
#[ignore] // 默认忽略，需要本机安装 Chrome：cargo test -- --ignored
async fn test_launch_and_find_element() {
    let launcher = ChromeLauncher::new(&config());
    let mut driver = launcher.open().await.expect("启动浏览器失败");

    driver
        .navigate("data:text/html,<input id='solemn:email'><a href='/pdf-download/1'>pdf</a>")
        .await
        .expect("导航失败");

    let input = driver
        .find_element(&Selector::id("solemn:email"), Duration::from_secs(5))
        .await
        .expect("查找失败");
    assert!(input.is_some(), "应当找到带冒号 id 的输入框");

    let link = driver
        .find_element(
            &Selector::xpath("//a[contains(@href, \"pdf-download\")]"),
            Duration::from_secs(5),
        )
        .await
        .expect("查找失败")
        .expect("应当找到下载链接");
    let href = driver.attribute(&link, "href").await.expect("读取属性失败");
    assert!(href.is_some_and(|h| h.contains("pdf-download")));

    driver.close().await.expect("关闭浏览器失败");
}

#[tokio::test]
#[ignore]
async fn test_missing_element_times_out() {
    let launcher = ChromeLauncher::new(&config());
    let mut driver = launcher.open().await.expect("启动浏览器失败");

    let found = driver
        .find_element(&Selector::id("does-not-exist"), Duration::from_millis(500))
        .await
        .expect("查找失败");
    assert!(found.is_none());

    driver.close().await.expect("关闭浏览器失败");
}
